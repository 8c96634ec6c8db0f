//! Generative text adapter.
//!
//! One POST per completion against a `generateContent`-style endpoint, with
//! the API key in the `key` query parameter and fixed sampling parameters.
//! There is no streaming, retry, or rate limiting.

mod assistant;
mod prompts;

pub use assistant::{Assistant, AssistantState, BLANK_INPUT_MESSAGE};
pub use prompts::AiAction;

use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default completion endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// Key value shipped in sample configs; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GEMINI_API_KEY";

/// Coarse classification of [`AiError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiErrorKind {
    Configuration,
    Transport,
    HttpStatus,
    Parse,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI API key is not configured")]
    MissingApiKey,

    #[error("Invalid AI endpoint URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {}", describe_payload(.error))]
    Status { status: u16, error: Option<Value> },

    #[error("Failed to parse AI response: {0}")]
    Parse(String),
}

impl AiError {
    pub fn kind(&self) -> AiErrorKind {
        match self {
            Self::MissingApiKey | Self::InvalidUrl { .. } => AiErrorKind::Configuration,
            Self::Transport(_) => AiErrorKind::Transport,
            Self::Status { .. } => AiErrorKind::HttpStatus,
            Self::Parse(_) => AiErrorKind::Parse,
        }
    }

    /// HTTP status code for [`AiError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe_payload(error: &Option<Value>) -> String {
    error
        .as_ref()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// HTTP client for the prompt-completion service.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    endpoint: String,
    api_key: Option<String>,
    config: GenerationConfig,
    client: Client,
}

impl GenerativeClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            config: GenerationConfig::default(),
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The configured key, unless it is empty or the sample placeholder.
    fn api_key(&self) -> Result<&str, AiError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(AiError::MissingApiKey),
        }
    }

    fn request_url(&self, key: &str) -> Result<Url, AiError> {
        Url::parse_with_params(&self.endpoint, &[("key", key)]).map_err(|e| AiError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }

    /// Send `prompt` and return the first candidate's text, trimmed.
    pub async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let key = self.api_key()?;
        let url = self.request_url(key)?;

        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: self.config,
        };

        // The URL carries the key, so only the endpoint is logged.
        tracing::debug!(
            "Sending completion request to {} ({} prompt chars)",
            self.endpoint,
            prompt.chars().count()
        );

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!("Completion response status {}", status);

        if !status.is_success() {
            let error = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|mut json| json.get_mut("error").map(Value::take));
            return Err(AiError::Status {
                status: status.as_u16(),
                error,
            });
        }

        let json: Value = serde_json::from_slice(&bytes)
            .map_err(|e| AiError::Parse(format!("response is not JSON: {}", e)))?;

        extract_text(&json).map(|text| text.trim().to_string())
    }

    /// Wrap `text` in the template for `action` and complete it.
    pub async fn run(&self, action: AiAction, text: &str) -> Result<String, AiError> {
        self.complete(&action.prompt(text)).await
    }

    pub async fn summarize(&self, text: &str) -> Result<String, AiError> {
        self.run(AiAction::Summarize, text).await
    }

    pub async fn improve_writing(&self, text: &str) -> Result<String, AiError> {
        self.run(AiAction::Improve, text).await
    }

    pub async fn generate_ideas(&self, text: &str) -> Result<String, AiError> {
        self.run(AiAction::Ideas, text).await
    }
}

/// `candidates[0].content.parts[0].text`, or a parse error.
fn extract_text(json: &Value) -> Result<&str, AiError> {
    json.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| AiError::Parse("missing candidates[0].content.parts[0].text".to_string()))
}
