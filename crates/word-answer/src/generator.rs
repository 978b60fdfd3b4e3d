//! Text generation providers.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use word_core::{GenerationConfig, GenerationParams, Generator, Result, WordError};

/// Error codes the chat API uses for prompts its safety system refused.
const CONTENT_POLICY_CODES: &[&str] = &["content_policy_violation", "content_filter"];

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// The prompt is sent as a single user message. Nothing is retried here.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiGenerator {
    /// Create a client for `endpoint` (e.g. `https://api.openai.com/v1`).
    pub fn new(endpoint: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WordError::generation(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a client from configuration, reading the key from the environment.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            WordError::config(format!(
                "Environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Self::new(
            &config.endpoint,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat API: model={}", params.model);

        let request = ChatRequest {
            model: &params.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WordError::generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_error(status, &error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| WordError::generation(format!("Failed to parse response: {}", e)))?;

        extract_reply(body)
    }
}

/// Map a failed chat response onto the error kinds callers act on.
fn classify_error(status: StatusCode, body: &str) -> WordError {
    let api_error = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);

    match status {
        StatusCode::BAD_REQUEST
            if api_error
                .as_ref()
                .and_then(|e| e.code.as_deref())
                .is_some_and(|code| CONTENT_POLICY_CODES.iter().any(|c| *c == code)) =>
        {
            let message = api_error.map(|e| e.message).unwrap_or_default();
            WordError::content_policy(message)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            WordError::generation(format!("Rate limited ({}): {}", status, body))
        }
        _ => {
            let message = api_error.map(|e| e.message).unwrap_or_else(|| body.to_string());
            WordError::generation(format!("API error ({}): {}", status, message))
        }
    }
}

fn extract_reply(body: ChatResponse) -> Result<String> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| WordError::generation("Response contained no choices"))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(WordError::content_policy("Completion stopped by content filter"));
    }

    choice
        .message
        .content
        .ok_or_else(|| WordError::generation("Response contained no message content"))
}

/// Returns the prompt unchanged. Used for offline runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        Ok(prompt.to_string())
    }
}

/// Scripted generator that records every call.
///
/// Replies with a fixed text, or fails with a content-policy rejection when
/// the prompt contains a configured marker.
#[derive(Debug, Default)]
pub struct MockGenerator {
    reply: String,
    reject_marker: Option<String>,
    failure: Option<String>,
    calls: Mutex<Vec<(String, GenerationParams)>>,
}

impl MockGenerator {
    /// Reply to every prompt with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    /// Reject prompts containing `marker` as a content-policy violation.
    pub fn rejecting(mut self, marker: impl Into<String>) -> Self {
        self.reject_marker = Some(marker.into());
        self
    }

    /// Fail every call with a plain generation error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(p, _)| p.clone()).collect())
            .unwrap_or_default()
    }

    /// Parameters of the most recent call.
    pub fn last_params(&self) -> Option<GenerationParams> {
        self.calls
            .lock()
            .ok()
            .and_then(|calls| calls.last().map(|(_, params)| params.clone()))
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.calls
            .lock()
            .map_err(|e| WordError::internal(format!("Failed to lock call log: {}", e)))?
            .push((prompt.to_string(), params.clone()));

        if let Some(message) = &self.failure {
            return Err(WordError::generation(message.clone()));
        }
        if let Some(marker) = &self.reject_marker {
            if prompt.contains(marker.as_str()) {
                return Err(WordError::content_policy(format!(
                    "prompt contains {:?}",
                    marker
                )));
            }
        }
        Ok(self.reply.clone())
    }
}
