//! OpenAI-compatible chat completions client.
//!
//! Works against any server exposing `POST {base_url}/chat/completions`,
//! including Ollama's `/v1` endpoint.

use crate::config::LlmConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from talking to the model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("cannot connect to model backend at {url}. Is it running?")]
    Connect { url: String },

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model backend error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model backend returned no choices")]
    EmptyChoices,

    #[error("response cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    /// Attach the name of the agent that authored the message.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            name: None,
        }
    }
}

/// Chat completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Cost of this usage with `price` given per 1000 tokens.
    pub fn cost(&self, price: [f64; 2]) -> f64 {
        (self.prompt_tokens as f64 * price[0] + self.completion_tokens as f64 * price[1])
            / 1000.0
    }
}

/// A single completion, reduced to what the agents use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub usage: Usage,
    /// Served from the response cache rather than the backend.
    #[serde(skip)]
    pub cached: bool,
}

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible endpoint.
pub struct OpenAiClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_seconds: u64,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: completions_url(&config.base_url),
            api_key: config.api_key.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        debug!(
            "POST {} with {} messages",
            self.endpoint,
            request.messages.len()
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        secs: self.timeout_seconds,
                    }
                } else if e.is_connect() {
                    LlmError::Connect {
                        url: self.endpoint.clone(),
                    }
                } else {
                    LlmError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let body: CompletionResponse = response.json().await?;
        parse_completion(body)
    }
}

fn parse_completion(body: CompletionResponse) -> Result<ChatCompletion, LlmError> {
    let choice = body.choices.into_iter().next().ok_or(LlmError::EmptyChoices)?;
    Ok(ChatCompletion {
        id: body.id,
        content: choice.message.content.unwrap_or_default(),
        usage: body.usage.unwrap_or_default(),
        cached: false,
    })
}

/// `{base_url}/chat/completions`, tolerating a trailing slash.
pub fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}
