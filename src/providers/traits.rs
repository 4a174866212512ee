use async_trait::async_trait;

use super::types::{ChatRequest, ChatResponse, ProviderError};

/// A remote text-generation service invoked once per exchange.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}
