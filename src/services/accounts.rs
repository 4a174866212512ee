use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::models::User;
use crate::services::database::Database;

pub const USER_KEY: &str = "chatbot_user";

const MIN_PASSWORD_LEN: usize = 8;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username regex"));
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("valid digit regex"));
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("valid special character regex")
});

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Username already exists. Please choose a different one.")]
    UsernameTaken,

    #[error("Username can only contain letters, numbers, and underscores")]
    InvalidUsername,

    #[error("Password must be at least 8 characters and include numbers and special characters")]
    WeakPassword,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("User not found. Please sign up first.")]
    UserNotFound,

    #[error("Not signed in")]
    NotLoggedIn,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Fields a profile update may change. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
}

/// Local, unauthenticated account handling.
///
/// Registered users only live for the lifetime of the process; the signed-in
/// user record is the only thing written to storage.
pub struct AccountService {
    db: Database,
    registry: HashMap<String, User>,
    current: Option<User>,
}

impl AccountService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            registry: HashMap::new(),
            current: None,
        }
    }

    /// Load the saved signed-in user, discarding a malformed record.
    pub async fn restore(db: Database) -> Self {
        let mut service = Self::new(db);

        match service.db.get_item(USER_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => {
                    service.registry.insert(user.username.clone(), user.clone());
                    service.current = Some(user);
                }
                Err(e) => {
                    tracing::warn!("Discarding malformed saved user: {}", e);
                    if let Err(e) = service.db.remove_item(USER_KEY).await {
                        tracing::error!("Failed to remove malformed user record: {}", e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read saved user: {}", e),
        }

        service
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.is_some()
    }

    pub async fn sign_up(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AccountError> {
        if self.registry.contains_key(username) {
            return Err(AccountError::UsernameTaken);
        }
        validate_username(username)?;
        validate_password(password)?;
        validate_email(email)?;

        let user = User::new(username, email);
        self.registry.insert(user.username.clone(), user.clone());
        self.set_current(user.clone()).await?;

        tracing::info!("Registered user {}", user.username);
        Ok(user)
    }

    /// Sign in a registered user. Passwords are not checked.
    pub async fn log_in(&mut self, username: &str, _password: &str) -> Result<User, AccountError> {
        validate_username(username)?;
        let user = self
            .registry
            .get(username)
            .cloned()
            .ok_or(AccountError::UserNotFound)?;
        self.set_current(user.clone()).await?;

        tracing::info!("User {} signed in", user.username);
        Ok(user)
    }

    pub async fn log_out(&mut self) -> Result<(), AccountError> {
        self.current = None;
        self.db
            .remove_item(USER_KEY)
            .await
            .context("Failed to clear saved user")?;
        Ok(())
    }

    pub async fn update_profile(&mut self, update: ProfileUpdate) -> Result<User, AccountError> {
        let current = self.current.clone().ok_or(AccountError::NotLoggedIn)?;
        let mut updated = current.clone();

        if let Some(name) = update.name.filter(|n| !n.is_empty() && *n != current.username) {
            if self.registry.contains_key(&name) {
                return Err(AccountError::UsernameTaken);
            }
            validate_username(&name)?;
            updated.username = name;
        }
        if let Some(email) = update.email.filter(|e| !e.is_empty()) {
            updated.email = email;
        }
        if update.phone_number.is_some() {
            updated.phone_number = update.phone_number;
        }
        if update.profile_image.is_some() {
            updated.profile_image = update.profile_image;
        }

        self.registry.remove(&current.username);
        self.registry.insert(updated.username.clone(), updated.clone());
        self.set_current(updated.clone()).await?;
        Ok(updated)
    }

    /// Forget the current user entirely. Conversation data is the caller's job.
    pub async fn delete_account(&mut self) -> Result<(), AccountError> {
        if let Some(user) = self.current.take() {
            self.registry.remove(&user.username);
            tracing::info!("Deleted account {}", user.username);
        }
        self.log_out().await
    }

    async fn set_current(&mut self, user: User) -> Result<(), AccountError> {
        let json = serde_json::to_string(&user).context("Failed to serialize user")?;
        self.db
            .set_item(USER_KEY, &json)
            .await
            .context("Failed to save user")?;
        self.current = Some(user);
        Ok(())
    }
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(AccountError::InvalidUsername)
    }
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    let long_enough = password.chars().count() >= MIN_PASSWORD_LEN;
    if long_enough && DIGIT_RE.is_match(password) && SPECIAL_RE.is_match(password) {
        Ok(())
    } else {
        Err(AccountError::WeakPassword)
    }
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    if email.contains('@') && email.contains('.') {
        Ok(())
    } else {
        Err(AccountError::InvalidEmail)
    }
}
