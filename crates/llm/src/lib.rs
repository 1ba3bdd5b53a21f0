use std::env;
use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini",
            LlmProvider::OpenAi => "openai",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "gemini" => Some(LlmProvider::Gemini),
            "openai" => Some(LlmProvider::OpenAi),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "gemini-2.0-flash-lite",
            LlmProvider::OpenAi => "gpt-4.1-mini",
        }
    }
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0} is not set")]
    MissingApiKey(String),
    #[error("{var} is not a valid key: {reason}")]
    InvalidApiKey { var: String, reason: String },
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion endpoint returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    Envelope(String),
}

impl LlmError {
    /// Network or timeout failure, as opposed to an answer the endpoint refused.
    pub fn is_transport(&self) -> bool {
        matches!(self, LlmError::Transport(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Text-completion client. One HTTP attempt per call; callers decide what a
/// failure means for their batch.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    provider: LlmProvider,
    model: String,
    options: GenerationOptions,
    api_key: SecretString,
    base_url: String,
}

impl LlmClient {
    pub fn new(
        provider: LlmProvider,
        model: impl Into<String>,
        options: GenerationOptions,
    ) -> Result<Self, LlmError> {
        let (api_key, base_url) = match provider {
            LlmProvider::Gemini => (
                read_api_key("GEMINI_API_KEY")?,
                env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                    "https://generativelanguage.googleapis.com/v1".to_string()
                }),
            ),
            LlmProvider::OpenAi => (
                read_api_key("OPENAI_API_KEY")?,
                env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            ),
        };
        let http = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            provider,
            model: model.into(),
            options,
            api_key,
            base_url,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        match self.provider {
            LlmProvider::Gemini => self.complete_gemini(prompt).await,
            LlmProvider::OpenAi => self.complete_openai(prompt).await,
        }
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key.expose_secret()
        );
        let payload = gemini_payload(prompt, self.options.temperature);
        let value = self.post_json(&url, &payload, None).await?;
        let response = parse_gemini_response(value)?;
        debug!(
            model = %self.model,
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "gemini completion received"
        );
        Ok(response)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let payload = json!({
            "model": self.model,
            "temperature": self.options.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let value = self
            .post_json(&url, &payload, Some(self.api_key.expose_secret()))
            .await?;
        let response = parse_openai_response(value)?;
        debug!(
            model = %self.model,
            prompt_tokens = response.prompt_tokens,
            completion_tokens = response.completion_tokens,
            "openai completion received"
        );
        Ok(response)
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        bearer: Option<&str>,
    ) -> Result<Value, LlmError> {
        let mut request = self.http.post(url).json(payload);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|err| LlmError::Transport(describe_transport(&err)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LlmError::Transport(describe_transport(&err)))?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| LlmError::Envelope(err.to_string()))
    }
}

pub fn gemini_payload(prompt: &str, temperature: f32) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "temperature": temperature }
    })
}

/// Reads `candidates[0].content.parts[0].text`.
pub fn parse_gemini_response(value: Value) -> Result<LlmResponse, LlmError> {
    let response: GeminiResponse =
        serde_json::from_value(value).map_err(|err| LlmError::Envelope(err.to_string()))?;
    let text = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| LlmError::Envelope("missing text in Gemini response".to_string()))?;
    let usage = response.usage.unwrap_or_default();
    Ok(LlmResponse {
        content: text.trim().to_string(),
        prompt_tokens: usage.prompt_tokens.unwrap_or(0),
        completion_tokens: usage.completion_tokens.unwrap_or(0),
    })
}

pub fn parse_openai_response(value: Value) -> Result<LlmResponse, LlmError> {
    let response: ChatResponse =
        serde_json::from_value(value).map_err(|err| LlmError::Envelope(err.to_string()))?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::Envelope("missing text in OpenAI response".to_string()))?;
    let usage = response.usage.unwrap_or_default();
    Ok(LlmResponse {
        content: text.trim().to_string(),
        prompt_tokens: usage.prompt_tokens.unwrap_or(0),
        completion_tokens: usage.completion_tokens.unwrap_or(0),
    })
}

fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn read_api_key(var: &str) -> Result<SecretString, LlmError> {
    let value = env::var(var).map_err(|_| LlmError::MissingApiKey(var.to_string()))?;
    validate_api_key(var, &value)?;
    Ok(SecretString::new(value))
}

fn validate_api_key(var: &str, value: &str) -> Result<(), LlmError> {
    if var.contains("OPENAI") && !value.starts_with("sk-") {
        return Err(LlmError::InvalidApiKey {
            var: var.to_string(),
            reason: "must start with 'sk-'".to_string(),
        });
    }
    if var.contains("GEMINI") && !value.starts_with("AI") {
        return Err(LlmError::InvalidApiKey {
            var: var.to_string(),
            reason: "Gemini keys start with 'AI'".to_string(),
        });
    }
    Ok(())
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    #[serde(rename = "usageMetadata")]
    usage: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Default, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_tokens: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    completion_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Default, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}
