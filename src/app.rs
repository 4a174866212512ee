use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::models::{Conversation, Message, User};
use crate::providers::{CompletionProvider, OpenRouterProvider};
use crate::services::accounts::{AccountError, ProfileUpdate};
use crate::services::chat::{self, ExchangeError, ExchangeState};
use crate::services::search;
use crate::services::settings::{AppSettings, ThemeMode};
use crate::services::{AccountService, ConversationStore, Database, SettingsService};

/// Everything the chat front-end can ask for.
#[derive(Debug, Clone)]
pub enum AppMsg {
    NewChat,
    ConversationSelected(String),
    DeleteConversation(String),
    /// Delete the active conversation.
    ClearChat,
    SendMessage(String),
    Search(String),
    ToggleTheme { system_prefers_dark: bool },
    SetTheme(ThemeMode),
    SignUp {
        username: String,
        email: String,
        password: String,
    },
    LogIn {
        username: String,
        password: String,
    },
    LogOut,
    UpdateProfile(ProfileUpdate),
    DeleteAllChats,
    DeleteAccount,
}

/// Application state, owned by whichever front-end drives it.
///
/// Every mutating message is followed by an awaited save, so what is on
/// disk never lags behind a completed `update`.
pub struct App {
    config: AppConfig,
    db: Database,
    provider: Arc<dyn CompletionProvider>,
    store: ConversationStore,
    accounts: AccountService,
    settings: AppSettings,
    search_query: String,
    exchange_state: ExchangeState,
    toast: Option<String>,
}

impl App {
    /// Open storage under the configured data directory and restore state.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.db_path())
            .await
            .context("Failed to open local storage")?;
        let provider = OpenRouterProvider::new(config.request_timeout)
            .context("Failed to create completion client")?;

        if config.api_key.is_none() {
            tracing::warn!("No API key configured; set KAI_API_KEY or OPENROUTER_API_KEY");
        }

        Ok(Self::restore(config, db, Arc::new(provider)).await)
    }

    pub async fn restore(
        config: AppConfig,
        db: Database,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let store = ConversationStore::restore(&db).await;
        let accounts = AccountService::restore(db.clone()).await;
        let settings = SettingsService::load(&db).await;

        tracing::info!(
            conversations = store.conversations().len(),
            logged_in = accounts.is_logged_in(),
            "State restored"
        );

        Self {
            config,
            db,
            provider,
            store,
            accounts,
            settings,
            search_query: String::new(),
            exchange_state: ExchangeState::Idle,
            toast: None,
        }
    }

    // --- View accessors ---

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.store.active()
    }

    /// The active conversation's messages narrowed by the search query.
    pub fn visible_messages(&self) -> Vec<&Message> {
        search::filter(self.store.active_messages(), &self.search_query)
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn current_user(&self) -> Option<&User> {
        self.accounts.current_user()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange_state
    }

    pub fn take_toast(&mut self) -> Option<String> {
        self.toast.take()
    }

    // --- Update ---

    pub async fn update(&mut self, msg: AppMsg) {
        match msg {
            AppMsg::NewChat => {
                let id = self.store.create_conversation();
                tracing::debug!("Created conversation {}", id);
                self.persist_chats().await;
            }
            AppMsg::ConversationSelected(id) => {
                if self.store.select_conversation(&id) {
                    self.persist_chats().await;
                } else {
                    tracing::debug!("Ignoring selection of unknown conversation {}", id);
                }
            }
            AppMsg::DeleteConversation(id) => {
                if self.store.delete_conversation(&id) {
                    self.persist_chats().await;
                }
            }
            AppMsg::ClearChat => {
                if let Some(id) = self.store.active_id().map(str::to_string) {
                    self.store.delete_conversation(&id);
                    self.persist_chats().await;
                }
            }
            AppMsg::SendMessage(text) => {
                self.handle_send_message(&text).await;
            }
            AppMsg::Search(query) => {
                self.search_query = query;
            }
            AppMsg::ToggleTheme {
                system_prefers_dark,
            } => {
                self.settings.toggle_theme(system_prefers_dark);
                self.persist_settings().await;
            }
            AppMsg::SetTheme(mode) => {
                self.settings.theme_mode = mode;
                self.persist_settings().await;
            }
            AppMsg::SignUp {
                username,
                email,
                password,
            } => match self.accounts.sign_up(&username, &email, &password).await {
                Ok(user) => {
                    if self.store.active_id().is_none() {
                        self.store.create_conversation();
                    }
                    self.post_notice(format!(
                        "Welcome, {}! Your account has been created successfully.",
                        user.username
                    ))
                    .await;
                }
                Err(e) => self.account_failed(e),
            },
            AppMsg::LogIn { username, password } => {
                match self.accounts.log_in(&username, &password).await {
                    Ok(user) => {
                        self.post_notice(format!(
                            "Welcome back, {}! You've successfully signed in.",
                            user.username
                        ))
                        .await;
                    }
                    Err(e) => self.account_failed(e),
                }
            }
            AppMsg::LogOut => match self.accounts.log_out().await {
                Ok(()) => {
                    self.post_notice("You have been logged out successfully.".to_string())
                        .await;
                }
                Err(e) => self.account_failed(e),
            },
            AppMsg::UpdateProfile(update) => {
                if let Err(e) = self.accounts.update_profile(update).await {
                    self.account_failed(e);
                }
            }
            AppMsg::DeleteAllChats => {
                self.search_query.clear();
                if let Err(e) = self.store.erase(&self.db).await {
                    tracing::error!("Failed to erase saved conversations: {}", e);
                    self.show_toast("Failed to delete saved chats");
                }
            }
            AppMsg::DeleteAccount => {
                if let Err(e) = self.accounts.delete_account().await {
                    self.account_failed(e);
                }
                self.search_query.clear();
                if let Err(e) = self.store.erase(&self.db).await {
                    tracing::error!("Failed to erase saved conversations: {}", e);
                    self.show_toast("Failed to delete saved chats");
                }
            }
        }
    }

    async fn handle_send_message(&mut self, text: &str) {
        let pending = match chat::begin(&mut self.store, text, &self.config, &self.settings) {
            Ok(pending) => pending,
            Err(ExchangeError::EmptyInput) => return,
            Err(e) => {
                tracing::error!("Failed to start exchange: {}", e);
                return;
            }
        };

        self.exchange_state = pending.state();
        self.persist_chats().await;

        let outcome = pending.complete(self.provider.as_ref()).await;
        self.exchange_state = outcome.state;
        if chat::apply(&mut self.store, outcome) {
            self.persist_chats().await;
        }
    }

    /// Append an assistant-authored status line to the active chat, if any.
    async fn post_notice(&mut self, text: String) {
        let Some(id) = self.store.active_id().map(str::to_string) else {
            self.show_toast(&text);
            return;
        };
        if let Err(e) = self.store.append_message(&id, Message::assistant(text)) {
            tracing::error!("Failed to post notice: {}", e);
            return;
        }
        self.persist_chats().await;
    }

    fn account_failed(&mut self, err: AccountError) {
        tracing::warn!("Account action failed: {}", err);
        self.show_toast(&err.to_string());
    }

    async fn persist_chats(&mut self) {
        if let Err(e) = self.store.persist(&self.db).await {
            tracing::error!("Failed to save conversations: {:#}", e);
            self.show_toast("Failed to save conversations");
        }
    }

    async fn persist_settings(&mut self) {
        if let Err(e) = SettingsService::save(&self.db, &self.settings).await {
            tracing::error!("Failed to save settings: {:#}", e);
            self.show_toast("Failed to save settings");
        }
    }

    fn show_toast(&mut self, message: &str) {
        self.toast = Some(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::providers::ProviderError;
    use crate::services::accounts::USER_KEY;
    use crate::services::chat::tests::{test_config, ScriptedProvider};
    use crate::services::chat::ERROR_REPLY;
    use crate::services::conversation::CHATS_KEY;

    async fn app_with(replies: Vec<Result<String, ProviderError>>) -> (App, Database) {
        let db = Database::new_in_memory().unwrap();
        let provider = Arc::new(ScriptedProvider::new(replies));
        let app = App::restore(test_config(), db.clone(), provider).await;
        (app, db)
    }

    fn signup(username: &str) -> AppMsg {
        AppMsg::SignUp {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "s3cret!pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_message_roundtrip_is_saved() {
        let (mut app, db) = app_with(vec![Ok("Hi there".to_string())]).await;

        app.update(AppMsg::SendMessage("Hello".to_string())).await;

        assert_eq!(app.exchange_state(), ExchangeState::Completed);
        let contents: Vec<&str> = app.visible_messages().into_iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Hello", "Hi there"]);

        let reloaded = App::restore(test_config(), db, Arc::new(ScriptedProvider::new(vec![]))).await;
        assert_eq!(reloaded.visible_messages().len(), 2);
        assert_eq!(
            reloaded.active_conversation().map(|c| c.id.clone()),
            app.active_conversation().map(|c| c.id.clone())
        );
    }

    #[tokio::test]
    async fn test_sent_text_keeps_indentation() {
        let (mut app, _db) = app_with(vec![Ok("ok".to_string())]).await;
        let snippet = "    let x = 1;\n    let y = 2;\n";

        app.update(AppMsg::SendMessage(snippet.to_string())).await;

        assert_eq!(app.visible_messages()[0].content, snippet);
    }

    #[tokio::test]
    async fn test_blank_send_changes_nothing() {
        let (mut app, db) = app_with(vec![]).await;

        app.update(AppMsg::SendMessage("   ".to_string())).await;

        assert!(app.conversations().is_empty());
        assert_eq!(app.exchange_state(), ExchangeState::Idle);
        assert!(db.get_item(CHATS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_exchange_shows_error_reply() {
        let (mut app, _db) =
            app_with(vec![Err(ProviderError::NetworkError("timeout".to_string()))]).await;

        app.update(AppMsg::SendMessage("Hello".to_string())).await;

        assert_eq!(app.exchange_state(), ExchangeState::Failed);
        let messages = app.visible_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_search_narrows_visible_messages() {
        let (mut app, _db) = app_with(vec![Ok("Hello World".to_string())]).await;
        app.update(AppMsg::SendMessage("greet me".to_string())).await;

        app.update(AppMsg::Search("world".to_string())).await;
        let visible = app.visible_messages();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].content, "Hello World");

        app.update(AppMsg::Search("  ".to_string())).await;
        assert_eq!(app.visible_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_chat_activates_next() {
        let (mut app, _db) = app_with(vec![]).await;
        app.update(AppMsg::NewChat).await;
        let first = app.active_conversation().unwrap().id.clone();
        app.update(AppMsg::NewChat).await;

        app.update(AppMsg::ClearChat).await;
        assert_eq!(app.active_conversation().map(|c| c.id.as_str()), Some(first.as_str()));

        app.update(AppMsg::ClearChat).await;
        assert!(app.active_conversation().is_none());
        assert!(app.visible_messages().is_empty());
    }

    #[tokio::test]
    async fn test_select_unknown_keeps_selection() {
        let (mut app, _db) = app_with(vec![]).await;
        app.update(AppMsg::NewChat).await;
        let active = app.active_conversation().unwrap().id.clone();

        app.update(AppMsg::ConversationSelected("nope".to_string())).await;
        assert_eq!(app.active_conversation().unwrap().id, active);
    }

    #[tokio::test]
    async fn test_sign_up_posts_welcome_in_new_chat() {
        let (mut app, _db) = app_with(vec![]).await;

        app.update(signup("kai")).await;

        assert_eq!(app.current_user().map(|u| u.username.as_str()), Some("kai"));
        let messages = app.visible_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].content,
            "Welcome, kai! Your account has been created successfully."
        );
    }

    #[tokio::test]
    async fn test_account_errors_become_toasts() {
        let (mut app, _db) = app_with(vec![]).await;

        app.update(AppMsg::SignUp {
            username: "bad name".to_string(),
            email: "x@example.com".to_string(),
            password: "s3cret!pass".to_string(),
        })
        .await;
        assert_eq!(
            app.take_toast().as_deref(),
            Some("Username can only contain letters, numbers, and underscores")
        );

        app.update(AppMsg::SignUp {
            username: "kai".to_string(),
            email: "not-an-email".to_string(),
            password: "s3cret!pass".to_string(),
        })
        .await;
        assert_eq!(app.take_toast().as_deref(), Some("Please enter a valid email address"));
        assert!(app.current_user().is_none());

        app.update(AppMsg::LogIn {
            username: "ghost".to_string(),
            password: String::new(),
        })
        .await;
        assert_eq!(app.take_toast().as_deref(), Some("User not found. Please sign up first."));
        assert!(app.take_toast().is_none());
    }

    #[tokio::test]
    async fn test_log_out_and_back_in_posts_notices() {
        let (mut app, _db) = app_with(vec![]).await;
        app.update(signup("kai")).await;
        app.update(AppMsg::LogOut).await;
        app.update(AppMsg::LogIn {
            username: "kai".to_string(),
            password: String::new(),
        })
        .await;

        let contents: Vec<&str> = app.visible_messages().into_iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents[1..],
            [
                "You have been logged out successfully.",
                "Welcome back, kai! You've successfully signed in."
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_account_wipes_storage() {
        let (mut app, db) = app_with(vec![Ok("ok".to_string())]).await;
        app.update(signup("kai")).await;
        app.update(AppMsg::SendMessage("Hello".to_string())).await;

        app.update(AppMsg::DeleteAccount).await;

        assert!(app.current_user().is_none());
        assert!(app.conversations().is_empty());
        assert!(db.get_item(CHATS_KEY).await.unwrap().is_none());
        assert!(db.get_item(USER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_theme_changes_are_saved() {
        let (mut app, db) = app_with(vec![]).await;

        app.update(AppMsg::ToggleTheme {
            system_prefers_dark: false,
        })
        .await;
        assert_eq!(app.settings().theme_mode, ThemeMode::Dark);

        app.update(AppMsg::SetTheme(ThemeMode::System)).await;
        assert_eq!(SettingsService::load(&db).await.theme_mode, ThemeMode::System);
    }

    #[tokio::test]
    async fn test_restore_from_corrupted_storage() {
        let db = Database::new_in_memory().unwrap();
        db.set_item(CHATS_KEY, "garbage").await.unwrap();
        db.set_item(USER_KEY, "garbage").await.unwrap();

        let app = App::restore(test_config(), db, Arc::new(ScriptedProvider::new(vec![]))).await;
        assert!(app.conversations().is_empty());
        assert!(app.current_user().is_none());
    }
}
