use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const APP_NAME: &str = "Kai";

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1:free";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant. Only use code blocks with ```language syntax when sharing actual code snippets. For regular text responses, do not use code formatting.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("Invalid timeout {0:?}: expected a whole number of seconds")]
    InvalidTimeout(String),

    #[error("Cannot determine data directory: set KAI_DATA_DIR, XDG_DATA_HOME or HOME")]
    NoDataDir,
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub referer: Option<String>,
    pub system_prompt: String,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("referer", &self.referer)
            .field("request_timeout", &self.request_timeout)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("KAI_API_KEY").or_else(|| get("OPENROUTER_API_KEY"));

        let base_url = match get("KAI_API_BASE_URL") {
            Some(raw) => validate_base_url(&raw)?,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let request_timeout = match get("KAI_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
                if secs == 0 {
                    return Err(ConfigError::InvalidTimeout(raw));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let data_dir = match get("KAI_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => get("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|| get("HOME").map(|home| PathBuf::from(home).join(".local/share")))
                .ok_or(ConfigError::NoDataDir)?
                .join("kai"),
        };

        Ok(Self {
            api_key,
            base_url,
            model: get("KAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            referer: get("KAI_REFERER"),
            system_prompt: get("KAI_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            request_timeout,
            data_dir,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("kai.db")
    }
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidBaseUrl {
                value: raw.to_string(),
                reason: format!("unsupported scheme {other}"),
            })
        }
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
