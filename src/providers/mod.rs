pub mod openrouter;
pub mod traits;
pub mod types;

pub use openrouter::OpenRouterProvider;
pub use traits::CompletionProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, ProviderError};
