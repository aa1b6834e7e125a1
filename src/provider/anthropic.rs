//! Anthropic Claude provider (Messages API).

use super::encode::{encode_pages, EncodedImage};
use super::http::{build_client, send_json};
use super::spec::ModelTier;
use super::VisionProvider;
use crate::config::{ProviderSettings, TranscriptionConfig};
use crate::error::TranscribeError;
use crate::page::PageImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS_SINGLE: u32 = 4096;
const MAX_TOKENS_BATCH: u32 = 8192;

pub const DEFAULT_SONNET_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_HAIKU_MODEL: &str = "claude-haiku-4-5-20251001";

/// Offered by `list-models` when the live listing is unavailable.
pub const KNOWN_MODELS: &[&str] = &[
    DEFAULT_HAIKU_MODEL,
    DEFAULT_SONNET_MODEL,
    "claude-opus-4-1-20250805",
    "claude-opus-4-20250514",
    "claude-sonnet-4-20250514",
];

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

// ── Messages API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Check the stop reason and join the text blocks.
fn response_text(resp: MessagesResponse) -> Result<String, String> {
    match resp.stop_reason.as_deref() {
        None | Some("end_turn") | Some("stop_sequence") => {}
        Some("max_tokens") => {
            return Err(
                "response truncated at the output token limit; try a smaller --batch-size".into(),
            )
        }
        Some("refusal") => {
            return Err("Claude declined to transcribe this content (stop_reason=refusal)".into())
        }
        Some(other) => return Err(format!("generation stopped with stop_reason={other}")),
    }
    let text: Vec<&str> = resp
        .content
        .iter()
        .filter(|b| b.kind == "text")
        .map(|b| b.text.as_str())
        .collect();
    if text.is_empty() {
        return Err("response contained no text".into());
    }
    Ok(text.join(""))
}

// ── Provider implementation ─────────────────────────────────────────────────

impl AnthropicProvider {
    /// Fails with `ProviderNotAvailable` when no API key is configured.
    pub fn new(
        settings: &ProviderSettings,
        model: Option<String>,
        tier: ModelTier,
        config: &TranscriptionConfig,
    ) -> Result<Self, TranscribeError> {
        let temperature = config.temperature();
        let api_key = settings.anthropic_api_key.clone().ok_or_else(|| {
            TranscribeError::unavailable(
                "anthropic",
                "Anthropic API key not provided. Set the ANTHROPIC_API_KEY environment variable.",
            )
        })?;
        let model = model.unwrap_or_else(|| {
            match tier {
                ModelTier::High => DEFAULT_SONNET_MODEL,
                ModelTier::Fast => DEFAULT_HAIKU_MODEL,
            }
            .to_string()
        });
        let provider = Self {
            client: build_client(settings.request_timeout_secs)?,
            api_key,
            base_url: settings.anthropic_base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        };
        info!(
            "Using {} (temperature={})",
            provider.display_name(),
            temperature
        );
        Ok(provider)
    }

    async fn call(
        &self,
        pages: &[PageImage],
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, TranscribeError> {
        let images = encode_pages(pages)?;
        let mut content = vec![ContentBlock::Text { text: prompt }];
        content.extend(images.iter().map(|img: &EncodedImage| ContentBlock::Image {
            source: ImageSource {
                kind: "base64",
                media_type: img.media_type,
                data: &img.data,
            },
        }));
        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        debug!("Anthropic: sending {} image(s) to {}", pages.len(), self.model);
        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let name = self.display_name();
        let resp: MessagesResponse = send_json(&name, request).await?;
        response_text(resp).map_err(|message| TranscribeError::api(name, message))
    }

    /// Live model list, or `None` when it cannot be fetched.
    pub async fn list_models(settings: &ProviderSettings) -> Option<Vec<String>> {
        let api_key = settings.anthropic_api_key.as_ref()?;
        let client = build_client(settings.request_timeout_secs).ok()?;
        let request = client
            .get(format!(
                "{}/v1/models",
                settings.anthropic_base_url.trim_end_matches('/')
            ))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION);
        let list: ModelList = send_json("anthropic", request).await.ok()?;
        let models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        (!models.is_empty()).then_some(models)
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn display_name(&self) -> String {
        match self.model.as_str() {
            DEFAULT_SONNET_MODEL => "Claude Sonnet 4.5".to_string(),
            DEFAULT_HAIKU_MODEL => "Claude Haiku 4.5".to_string(),
            other => format!("Claude ({other})"),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn transcribe_one(&self, page: &PageImage, prompt: &str) -> Result<String, TranscribeError> {
        self.call(std::slice::from_ref(page), prompt, MAX_TOKENS_SINGLE)
            .await
    }

    async fn transcribe_batch(
        &self,
        pages: &[PageImage],
        prompt: &str,
    ) -> Result<String, TranscribeError> {
        self.call(pages, prompt, MAX_TOKENS_BATCH).await
    }
}
