//! Client side of the external content generator.
//!
//! Four JSON-over-HTTP calls: transform an artifact, synthesize narration,
//! take a tutoring turn, and grade a spoken answer. Everything the service
//! returns passes through [`crate::schema`] or [`crate::audio`] before the rest
//! of the crate sees it.

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;

use crate::audio::{AudioError, PcmClip};
use crate::document::{Message, TransformedDocument};
use crate::profile::Profile;
use crate::schema::{self, SchemaError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("generator error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("generator returned a non-conforming document: {0}")]
    Schema(#[from] SchemaError),

    #[error("generator returned an empty {0} response")]
    EmptyResponse(&'static str),

    #[error("generator returned unusable narration: {0}")]
    Audio(#[from] AudioError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub base_url: url::Url,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl GeneratorConfig {
    /// Reads `REFORMAT_API_BASE_URL`, `REFORMAT_API_KEY` and `REFORMAT_TIMEOUT_SECS`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw = lookup("REFORMAT_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let base_url = url::Url::parse(raw.trim())
            .with_context(|| format!("invalid REFORMAT_API_BASE_URL={raw:?}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("REFORMAT_API_BASE_URL must be http or https, got {raw:?}");
        }

        let api_key = lookup("REFORMAT_API_KEY")
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty());

        let timeout = match lookup("REFORMAT_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("invalid REFORMAT_TIMEOUT_SECS={raw:?}"))?;
                if secs == 0 {
                    anyhow::bail!("REFORMAT_TIMEOUT_SECS must be > 0");
                }
                secs
            }
        };

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout),
        })
    }

    pub fn with_base_url(base_url: &str) -> anyhow::Result<Self> {
        Self::from_lookup(|key| (key == "REFORMAT_API_BASE_URL").then(|| base_url.to_owned()))
    }

    pub fn endpoint(&self, name: &str) -> String {
        let base_url = self.base_url.as_str().trim_end_matches('/');
        format!("{base_url}/{name}")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub data_base64: String,
    pub mime_type: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub history: Vec<Message>,
    pub new_message: String,
    pub context_title: String,
    pub context_script: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub audio_base64: String,
    pub context_summary: String,
    pub profile: Profile,
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformedDocument, GenerationError>;

    async fn narrate(&self, text: &str) -> Result<PcmClip, GenerationError>;

    async fn chat(&self, request: &ChatRequest) -> Result<String, GenerationError>;

    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpGenerator {
    pub fn new(config: GeneratorConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build generator http client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        name: &str,
        body: &T,
    ) -> Result<String, GenerationError> {
        let endpoint = self.config.endpoint(name);
        let mut request = self.client.post(&endpoint).json(body);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let transport = |source| GenerationError::Transport {
            endpoint: endpoint.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let raw = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
            tracing::error!(endpoint = %endpoint, status = status.as_u16(), %message, "generator call failed");
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message,
            });
        }
        Ok(raw)
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn transform(
        &self,
        request: &TransformRequest,
    ) -> Result<TransformedDocument, GenerationError> {
        tracing::info!(
            profile = %request.profile,
            mime_type = %request.mime_type,
            bytes = request.data_base64.len(),
            "generator: transform"
        );
        let raw = self.post("transform", request).await?;
        if raw.trim().is_empty() {
            return Err(GenerationError::EmptyResponse("transform"));
        }
        // Models sometimes wrap the object in prose or a code fence.
        let payload = extract_json_object(&raw).unwrap_or(raw.as_str());
        let document = schema::parse_document(payload)?;
        tracing::info!(
            title = %document.title,
            blocks = document.blocks.len(),
            activities = document.activities.len(),
            "generator: transform done"
        );
        Ok(document)
    }

    async fn narrate(&self, text: &str) -> Result<PcmClip, GenerationError> {
        tracing::info!(chars = text.chars().count(), "generator: tts");
        let raw = self
            .post("tts", &serde_json::json!({ "text": text }))
            .await?;
        let audio = reply_field(&raw, "audioData").ok_or(GenerationError::EmptyResponse("tts"))?;
        Ok(crate::audio::decode_pcm_base64(&audio)?)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        tracing::info!(
            profile = %request.profile,
            history = request.history.len(),
            "generator: chat"
        );
        let raw = self.post("chat", request).await?;
        reply_field(&raw, "text").ok_or(GenerationError::EmptyResponse("chat"))
    }

    async fn feedback(&self, request: &FeedbackRequest) -> Result<String, GenerationError> {
        tracing::info!(
            profile = %request.profile,
            bytes = request.audio_base64.len(),
            "generator: feedback"
        );
        let raw = self.post("feedback", request).await?;
        reply_field(&raw, "text").ok_or(GenerationError::EmptyResponse("feedback"))
    }
}

/// Accepts both `{"error": "..."}` and `{"error": {"message": "..."}}`.
fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let error = value.get("error")?;
    let message = error
        .as_str()
        .or_else(|| error.get("message")?.as_str())?
        .to_owned();
    Some(message)
}

fn reply_field(raw_json: &str, key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let text = value.get(key)?.as_str()?;
    (!text.trim().is_empty()).then(|| text.to_owned())
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
