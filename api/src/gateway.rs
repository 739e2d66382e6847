//! Outbound calls to the OpenAI-compatible text-generation service.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sampling is pinned, not configurable: temperature 0 keeps the model
/// deterministic so replaying an entry reproduces its analysis, and the
/// token ceiling fits the JSON schema rather than free-form prose.
const TEMPERATURE: f64 = 0.0;
const MAX_TOKENS: u32 = 200;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the model service, read once at process start
/// and carried in `AppState`, never re-read mid-request.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ModelConfig {
    /// Read `SOLACE_MODEL_*` variables. Only the API key is required;
    /// everything else has a production default. Panics when the key is
    /// missing, consistent with the fail-fast boot sequence in `main`.
    pub fn from_env() -> Self {
        let api_key = std::env::var("SOLACE_MODEL_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .expect("SOLACE_MODEL_API_KEY must be set");

        Self {
            api_key,
            base_url: base_url_from(std::env::var("SOLACE_MODEL_BASE_URL").ok()),
            model: value_or_default(std::env::var("SOLACE_MODEL").ok(), DEFAULT_MODEL),
            timeout: Duration::from_secs(timeout_secs_from(
                std::env::var("SOLACE_MODEL_TIMEOUT_SECS").ok(),
            )),
        }
    }
}

fn value_or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Trailing slashes are stripped so path joining stays predictable.
fn base_url_from(value: Option<String>) -> String {
    let base_url = value_or_default(value, DEFAULT_BASE_URL);
    base_url.trim_end_matches('/').to_string()
}

fn timeout_secs_from(value: Option<String>) -> u64 {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

/// Capability seam for the model call, so the pipeline can run against
/// stubs in tests. Implementations must not retry: a failed call is fatal
/// to the current request and the caller may resubmit.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Mirror of `choices[0].message.content` with every step optional:
/// upstream schemas drift, and a missing piece is an empty completion, not
/// a decode crash. Whitespace-only text is passed through; the validator
/// downstream rejects it as malformed with the raw text preserved.
fn extract_completion(response: ChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .ok_or(AppError::EmptyCompletion)
}

/// Client for one OpenAI-compatible chat-completions endpoint. Performs
/// exactly one HTTP call per invocation with deterministic sampling.
#[derive(Clone)]
pub struct ModelGateway {
    client: reqwest::Client,
    config: ModelConfig,
}

impl ModelGateway {
    pub fn new(config: ModelConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

impl TextGenerator for ModelGateway {
    async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(model = %self.config.model, "dispatching completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body,
                "model service returned non-success status"
            );
            return Err(AppError::Gateway {
                status: Some(status.as_u16()),
                detail: body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|err| AppError::Gateway {
                status: Some(status.as_u16()),
                detail: format!("undecodable completion body: {err}"),
            })?;

        let text = extract_completion(completion)?;
        tracing::debug!(completion_chars = text.chars().count(), "completion received");
        Ok(text)
    }
}
