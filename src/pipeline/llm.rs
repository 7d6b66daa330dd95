//! VLM interaction: build the vision request, call the API, classify failures.
//!
//! This module speaks the OpenAI chat-completions wire format directly over
//! `reqwest`, which every mainstream vision gateway (OpenAI, Azure, vLLM,
//! LiteLLM, Ollama's `/v1`) accepts. Prompt text lives in [`crate::prompts`];
//! fence cleanup lives in [`crate::pipeline::postprocess`].
//!
//! ## Failure classification
//!
//! | Situation | Result |
//! |-----------|--------|
//! | no API key | [`AnalysisError::MissingApiKey`], no request sent |
//! | non-2xx | [`AnalysisError::Api`] with the body's `error.message`, else the status text |
//! | connection / timeout | [`AnalysisError::Transport`] |
//! | 2xx with undecodable body | [`AnalysisError::InvalidResponse`] |
//!
//! There is deliberately no retry loop: one user action is one API call.

use crate::config::{DiagramConfig, Dialect, ImageDetail};
use crate::error::AnalysisError;
use crate::pipeline::encode::ImagePayload;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

// ── Request ──────────────────────────────────────────────────────────────

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

/// One part of a multimodal user message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

/// Build the request for `dialect`.
///
/// ## Message Layout
///
/// A single user message holding (in order):
/// 1. **Text part** — the dialect instruction (or the configured override)
/// 2. **Image part** — the upload as a `data:` URL with its declared media type
pub fn build_request(
    image: &ImagePayload,
    dialect: Dialect,
    config: &DiagramConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: config.instruction_for(dialect).to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                        detail: config.image_detail,
                    },
                },
            ],
        }],
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    }
}

// ── Response ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice; a missing choice or content is an empty string.
    pub fn first_content(&self) -> &str {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
            .unwrap_or("")
    }
}

/// Raw model reply plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

// ── Call ─────────────────────────────────────────────────────────────────

/// Send one vision request and return the raw (uncleaned) reply.
pub async fn complete(
    image: &ImagePayload,
    dialect: Dialect,
    config: &DiagramConfig,
) -> Result<Completion, AnalysisError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(AnalysisError::missing_api_key)?;

    let client = match &config.client {
        Some(client) => client.clone(),
        None => build_client(config)?,
    };

    let body = build_request(image, dialect, config);
    let url = config.chat_completions_url();
    debug!(
        "POST {} model={} dialect={} image={} bytes",
        url,
        body.model,
        dialect,
        image.len()
    );

    let mut request = client.post(&url).bearer_auth(api_key).json(&body);
    if let Some(secs) = config.api_timeout_secs {
        request = request.timeout(Duration::from_secs(secs));
    }

    let response = request
        .send()
        .await
        .map_err(|e| AnalysisError::transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AnalysisError::transport(e.to_string()))?;

    if !status.is_success() {
        let message = api_error_message(&text)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| status.as_str().to_string());
        warn!("Model API returned {}: {}", status, message);
        return Err(AnalysisError::api(status.as_u16(), message));
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(&text)
        .map_err(|e| AnalysisError::InvalidResponse(format!("Invalid API response: {e}")))?;

    let usage = parsed.usage.unwrap_or_default();
    Ok(Completion {
        content: parsed.first_content().to_string(),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    })
}

fn build_client(config: &DiagramConfig) -> Result<reqwest::Client, AnalysisError> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.api_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| AnalysisError::transport(e.to_string()))
}

/// Extract `error.message` from an API error body, if there is one.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
}
