//! Completion service client
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::CompletionConfig;
use crate::error::ChatError;
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Longest slice of an error body kept in a `ServiceRejected` message
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

/// One chat-completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
    pub max_output_tokens: u32,
    pub sampling: SamplingParams,
}

/// Language-model completion. Returns the raw reply text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Reusable completion client (connection-pooled)
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Config("completion API key not configured".to_string()))?;

        let body = ChatCompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_output_tokens,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
        };

        info!(model = %self.model, messages = request.messages.len(), "Calling completion service");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                ChatError::TransientService(format!("request failed: {}", e))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::TransientService(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            error!(status = status.as_u16(), "Completion service error response");
            return Err(classify_status(status, &text));
        }

        let content = extract_content(&text)?;
        info!(chars = content.len(), "Completion received");

        Ok(content)
    }
}

/// Rate limiting and server faults are worth retrying; everything else is not
fn classify_status(status: StatusCode, body: &str) -> ChatError {
    let message: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ChatError::TransientService(format!("status {}: {}", status.as_u16(), message))
    } else {
        ChatError::ServiceRejected {
            status: status.as_u16(),
            message,
        }
    }
}

/// `choices[0].message.content` of a completion envelope
fn extract_content(body: &str) -> Result<String> {
    let envelope: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::MalformedResponse(format!("undecodable completion: {}", e)))?;

    envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ChatError::MalformedResponse("completion has no content".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
