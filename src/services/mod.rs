pub mod accounts;
pub mod chat;
pub mod conversation;
pub mod database;
pub mod search;
pub mod settings;

pub use accounts::AccountService;
pub use conversation::ConversationStore;
pub use database::Database;
pub use settings::SettingsService;
