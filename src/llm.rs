//! Chat-completion client for the generative text API.
//!
//! The [`CompletionClient`] trait is the seam the suggestion service talks to;
//! [`OpenAiClient`] implements it against any OpenAI-compatible
//! `chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::OpenAiConfig;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the model for a single JSON object.
    pub json_output: bool,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("upstream rejected the API key: {0}")]
    InvalidCredentials(String),

    #[error("upstream rate limit reached: {0}")]
    RateLimited(String),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("request to upstream failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the text of the first completion choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        // No overall request timeout here: callers race their own deadline.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "completion request failed");
                LlmError::Transport(e)
            })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let parsed: ApiResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Malformed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Malformed("no completion choices returned".into()))?;
        debug!(content_len = content.len(), "completion received");
        Ok(content)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    match status {
        StatusCode::UNAUTHORIZED => LlmError::InvalidCredentials(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(message),
        _ => LlmError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(&OpenAiConfig {
            api_key: "sk-test".into(),
            base_url: "http://localhost:9999/v1/".into(),
            model: "gpt-test".into(),
            temperature: 0.5,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        assert_eq!(client().endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn json_output_requests_json_object_format() {
        let client = client();
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            temperature: 0.2,
            json_output: true,
        };
        let body = serde_json::to_value(client.body(&request)).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");

        let plain = CompletionRequest {
            json_output: false,
            ..request
        };
        let body = serde_json::to_value(client.body(&plain)).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn classify_failure_distinguishes_auth_and_capacity() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, body),
            LlmError::InvalidCredentials(m) if m.contains("Incorrect API key")
        ));
        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            LlmError::RateLimited(m) if m == "slow down"
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, "<html>"),
            LlmError::Upstream { status: 502, .. }
        ));
    }
}
