//! Chat completion client.
//!
//! [`CompletionClient`] is the capability boundary for turning an ordered
//! message sequence into model-generated text. [`HttpCompletionClient`] talks
//! to any OpenAI-compatible `/chat/completions` endpoint (DeepSeek by
//! default) with bearer authentication.
//!
//! The client is single-shot: it makes exactly one request per call. Retry
//! policy belongs to callers that can judge whether retrying helps (see the
//! structured extraction loop in [`crate::events`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::CompletionConfig;
use crate::models::ChatMessage;

/// Completion failure, distinguishable by kind.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion client misconfigured: {0}")]
    Config(String),
    #[error("completion request failed: {0}")]
    Network(String),
    #[error("completion API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
    #[error("completion response contained no choices")]
    Empty,
}

/// Capability boundary for chat-style text generation.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the assistant's reply text.
    ///
    /// `temperature` is forwarded when given and omitted from the request
    /// otherwise, leaving the endpoint's default in effect.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP client for OpenAI-compatible chat completion endpoints.
///
/// The bearer credential is read at construction from the environment
/// variable named by `completion.api_key_env` and is never logged.
pub struct HttpCompletionClient {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            CompletionError::Config(format!(
                "environment variable {} not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;

        Ok(Self {
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, CompletionError> {
        debug!(messages = messages.len(), model = %self.model, "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CompletionError::Empty)?;

        debug!(chars = content.len(), "completion received");
        Ok(content)
    }
}
