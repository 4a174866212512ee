use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::models::*;
use crate::models::Role;
use crate::providers::traits::CompletionProvider;
use crate::providers::types::{ChatMessage, ChatRequest, ChatResponse, ProviderError};

/// Client for OpenRouter and other OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenRouterProvider {
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn translate_role(role: &Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn build_messages(system_prompt: Option<&str>, messages: &[ChatMessage]) -> Vec<WireMessage> {
        let mut result = Vec::with_capacity(messages.len() + 1);

        if let Some(prompt) = system_prompt {
            if !prompt.is_empty() {
                result.push(WireMessage {
                    role: "system".to_string(),
                    content: Some(prompt.to_string()),
                });
            }
        }

        result.extend(messages.iter().map(|msg| WireMessage {
            role: Self::translate_role(&msg.role).to_string(),
            content: Some(msg.content.clone()),
        }));

        result
    }

    fn completions_url(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn parse_error_message(status: StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
            return format!("HTTP {}: {}", status.as_u16(), parsed.error.message);
        }
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Request failed")
        )
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn send_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let api_key = request
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::AuthError("API key not configured".to_string()))?;

        let body = CompletionRequest {
            model: request.model.clone(),
            messages: Self::build_messages(request.system_prompt.as_deref(), &request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut req = self
            .client
            .post(Self::completions_url(&request.base_url))
            .header("content-type", "application/json")
            .bearer_auth(api_key)
            .json(&body);

        if let Some(referer) = &request.referer {
            req = req.header("HTTP-Referer", referer);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::NetworkError(format!("Request timed out: {e}"))
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthError("Invalid API key".to_string()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RequestFailed(Self::parse_error_message(
                status, &body,
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let (tokens_in, tokens_out) = completion
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((None, None));

        Ok(ChatResponse {
            content,
            model: completion.model.unwrap_or(request.model),
            tokens_in,
            tokens_out,
        })
    }
}
