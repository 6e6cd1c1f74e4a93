//! AI responder: prompt in, generated text out.
//!
//! The responder is a black box with unbounded upstream latency; the HTTP
//! implementation bounds it with the configured request timeout. Callers
//! treat every failure as degraded text, not a protocol error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use huddle_config::AiConfig;

/// Text delivered to the room when the responder fails.
pub const FALLBACK_REPLY: &str = "AI error occurred!";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("missing AI api key")]
    ApiKeyMissing,
    #[error("responder http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid responder response: {0}")]
    Response(#[from] serde_json::Error),
    #[error("responder returned no content")]
    EmptyCompletion,
}

/// Generates a reply for a prompt. Implemented over HTTP in production and
/// by scripted stand-ins in tests.
#[async_trait]
pub trait AiResponder: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Responder backed by an OpenRouter-style chat completions endpoint.
pub struct HttpResponder {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl HttpResponder {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl AiResponder for HttpResponder {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::ApiKeyMissing)?;

        let request = CompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        extract_content(&body)
    }
}

fn extract_content(body: &str) -> Result<String, AiError> {
    let completion: CompletionResponse = serde_json::from_str(body)?;
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .ok_or(AiError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_content_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"2 + 2 = 4"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "2 + 2 = 4");
    }

    #[test]
    fn extract_content_rejects_empty_choices() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(AiError::EmptyCompletion)
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(AiError::EmptyCompletion)
        ));
    }

    #[test]
    fn extract_content_rejects_malformed_body() {
        assert!(matches!(
            extract_content("not json"),
            Err(AiError::Response(_))
        ));
    }

    #[tokio::test]
    async fn generate_without_api_key_fails_fast() {
        let responder = HttpResponder::new(&AiConfig::default()).unwrap();
        let result = responder.generate("hello").await;
        assert!(matches!(result, Err(AiError::ApiKeyMissing)));
    }
}
