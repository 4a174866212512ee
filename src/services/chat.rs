use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{Conversation, Message};
use crate::providers::{ChatMessage, ChatRequest, CompletionProvider};
use crate::services::conversation::{ConversationStore, StoreError};
use crate::services::settings::AppSettings;

/// Assistant reply recorded when the completion call fails for any reason.
pub const ERROR_REPLY: &str =
    "Sorry, there was an error processing your request. Please try again later.";

/// Assistant reply recorded when the service answers with no text.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("Message is empty")]
    EmptyInput,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingResponse,
    Completed,
    Failed,
}

/// An exchange whose user message is already recorded and whose request is
/// ready to go out.
#[derive(Debug)]
pub struct PendingExchange {
    pub conversation_id: String,
    pub request: ChatRequest,
}

/// The settled result of an exchange, not yet applied to the store.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub conversation_id: String,
    pub state: ExchangeState,
    pub reply: Message,
}

/// Build a `ChatRequest` from the configuration and current settings.
pub fn build_request(
    config: &AppConfig,
    settings: &AppSettings,
    chat_messages: Vec<ChatMessage>,
) -> ChatRequest {
    ChatRequest {
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        messages: chat_messages,
        base_url: config.base_url.clone(),
        temperature: Some(settings.temperature),
        system_prompt: Some(config.system_prompt.clone()),
        max_tokens: Some(settings.max_tokens),
        referer: config.referer.clone(),
    }
}

/// Convert `Message` list to `ChatMessage` list for the provider API.
pub fn messages_to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}

/// Record the user's message and prepare the completion request.
///
/// Starts a new conversation when none is active. Blank input changes nothing;
/// anything else is recorded and sent exactly as typed.
pub fn begin(
    store: &mut ConversationStore,
    text: &str,
    config: &AppConfig,
    settings: &AppSettings,
) -> Result<PendingExchange, ExchangeError> {
    if text.trim().is_empty() {
        return Err(ExchangeError::EmptyInput);
    }

    let conversation_id = match store.active_id() {
        Some(id) => id.to_string(),
        None => store.insert_front(Conversation::titled_from(text)),
    };

    store.append_message(&conversation_id, Message::user(text))?;

    let history = store
        .get(&conversation_id)
        .map(|c| messages_to_chat_messages(&c.messages))
        .unwrap_or_default();

    Ok(PendingExchange {
        conversation_id,
        request: build_request(config, settings, history),
    })
}

impl PendingExchange {
    pub fn state(&self) -> ExchangeState {
        ExchangeState::AwaitingResponse
    }

    /// Await the completion. Every failure becomes the fixed error reply.
    pub async fn complete(self, provider: &dyn CompletionProvider) -> ExchangeOutcome {
        let message_count = self.request.messages.len();
        tracing::debug!(
            conversation_id = %self.conversation_id,
            provider = provider.name(),
            message_count,
            "Sending completion request"
        );

        let (state, reply) = match provider.send_message(self.request).await {
            Ok(response) => {
                tracing::info!(
                    conversation_id = %self.conversation_id,
                    model = %response.model,
                    tokens_in = ?response.tokens_in,
                    tokens_out = ?response.tokens_out,
                    "Completion received"
                );
                let text = if response.content.trim().is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    response.content
                };
                (ExchangeState::Completed, Message::assistant(text))
            }
            Err(e) => {
                tracing::error!(conversation_id = %self.conversation_id, "Completion failed: {}", e);
                (ExchangeState::Failed, Message::assistant(ERROR_REPLY))
            }
        };

        ExchangeOutcome {
            conversation_id: self.conversation_id,
            state,
            reply,
        }
    }
}

/// Append the reply to its originating conversation.
///
/// Returns `false` when that conversation was deleted while the request was
/// in flight; the reply is dropped.
pub fn apply(store: &mut ConversationStore, outcome: ExchangeOutcome) -> bool {
    match store.append_message(&outcome.conversation_id, outcome.reply) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Dropping reply for a conversation that no longer exists: {}", e);
            false
        }
    }
}
