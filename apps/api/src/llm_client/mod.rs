/// LLM client — the single point of entry for all completion calls.
///
/// ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
/// All LLM interactions MUST go through this module.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::TokenUsage;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Default model for all completion calls.
pub const MODEL: &str = "claude-sonnet-4-5-20250929";
/// Default per-call token budget.
pub const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// A successful completion: response text plus token accounting.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub text: String,
    pub usage: TokenUsage,
}

/// Seam over completion calls, so callers that sequence many of them can be
/// exercised without a network.
pub trait Completer {
    fn complete(
        &self,
        model: &str,
        max_tokens: u32,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<CompletionOutcome, LlmError>> + Send;
}

/// The single LLM client used by all handlers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl Completer for LlmClient {
    async fn complete(
        &self,
        model: &str,
        max_tokens: u32,
        prompt: &str,
    ) -> Result<CompletionOutcome, LlmError> {
        LlmClient::complete(self, model, max_tokens, prompt).await
    }
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// One completion round trip: a single user-role message, no retry.
    /// A transport or API failure is the caller's to record; batch rows must
    /// fail individually and immediately.
    pub async fn complete(
        &self,
        model: &str,
        max_tokens: u32,
        prompt: &str,
    ) -> Result<CompletionOutcome, LlmError> {
        let request_body = AnthropicRequest {
            model,
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Surface the API's own message when the body parses as an error
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;

        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "completion succeeded"
        );

        let text = parsed
            .content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.clone())
            .ok_or(LlmError::EmptyContent)?;

        Ok(CompletionOutcome {
            text,
            usage: TokenUsage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_body_extracts_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let parsed: AnthropicError = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Overloaded");
    }

    #[test]
    fn test_response_text_block_is_first_text() {
        let body = r#"{
            "content": [
                {"type": "thinking", "text": null},
                {"type": "text", "text": "risposta"}
            ],
            "usage": {"input_tokens": 5, "output_tokens": 7}
        }"#;
        let parsed: AnthropicResponse = serde_json::from_str(body).unwrap();
        let text = parsed
            .content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.clone());
        assert_eq!(text.as_deref(), Some("risposta"));
        assert_eq!(parsed.usage.output_tokens, 7);
    }
}
