//! Google Gemini provider (Generative Language API, `generateContent`).
//!
//! Gemini applies content-safety and recitation filters that regularly
//! misfire on handwritten journals. Those filters truncate or empty the
//! answer while still returning HTTP 200, so the candidate's `finishReason`
//! is checked on every response and anything but a normal stop is an error.

use super::encode::encode_pages;
use super::http::{build_client, send_json};
use super::spec::ModelTier;
use super::VisionProvider;
use crate::config::{ProviderSettings, TranscriptionConfig};
use crate::error::TranscribeError;
use crate::page::PageImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_PRO_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_FLASH_MODEL: &str = "gemini-2.5-flash";

pub const KNOWN_MODELS: &[&str] = &[
    "gemini-3-pro-preview",
    "gemini-3-flash-preview",
    DEFAULT_PRO_MODEL,
    DEFAULT_FLASH_MODEL,
    "gemini-2.0-flash",
];

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

// ── generateContent request/response types ──────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'static str,
    data: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

const SWITCH_HINT: &str = "Try a different provider (e.g. --model claude-sonnet).";

/// Inspect the finish reason and collect the candidate text.
fn response_text(resp: GenerateResponse) -> Result<String, String> {
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(match resp.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => format!("Gemini blocked the request (blockReason={reason}). {SWITCH_HINT}"),
            None => "Gemini returned no candidates".to_string(),
        });
    };

    match candidate.finish_reason.as_deref() {
        None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED") => {}
        Some("RECITATION") => {
            return Err(format!(
                "Gemini flagged potential copyrighted content (finishReason=RECITATION). \
                 This is usually a false positive for handwriting; retry, or {}",
                SWITCH_HINT.to_lowercase()
            ))
        }
        Some("SAFETY") => {
            return Err(format!(
                "Gemini blocked the response due to safety filters (finishReason=SAFETY). {SWITCH_HINT}"
            ))
        }
        Some(other) => {
            return Err(format!(
                "Gemini stopped generation with finishReason={other}. {SWITCH_HINT}"
            ))
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err("Gemini returned an empty response".to_string());
    }
    Ok(text)
}

// ── Provider implementation ─────────────────────────────────────────────────

impl GoogleProvider {
    /// Fails with `ProviderNotAvailable` when no API key is configured.
    ///
    /// The sampling temperature is taken from `config`, which has already
    /// been range-checked by its builder.
    pub fn new(
        settings: &ProviderSettings,
        model: Option<String>,
        tier: ModelTier,
        config: &TranscriptionConfig,
    ) -> Result<Self, TranscribeError> {
        let temperature = config.temperature();
        let api_key = settings.google_api_key.clone().ok_or_else(|| {
            TranscribeError::unavailable(
                "google",
                "Google API key not provided. Set the GOOGLE_API_KEY environment variable.",
            )
        })?;
        let model = model.unwrap_or_else(|| {
            match tier {
                ModelTier::High => DEFAULT_PRO_MODEL,
                ModelTier::Fast => DEFAULT_FLASH_MODEL,
            }
            .to_string()
        });
        let provider = Self {
            client: build_client(settings.request_timeout_secs)?,
            api_key,
            base_url: settings.google_base_url.trim_end_matches('/').to_string(),
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

    async fn call(&self, pages: &[PageImage], prompt: &str) -> Result<String, TranscribeError> {
        let images = encode_pages(pages)?;
        let mut parts = vec![Part::Text { text: prompt }];
        parts.extend(images.iter().map(|img| Part::Image {
            inline_data: InlineData {
                mime_type: img.media_type,
                data: &img.data,
            },
        }));
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_ONLY_HIGH",
                })
                .collect(),
        };

        debug!("Gemini: sending {} image(s) to {}", pages.len(), self.model);
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        let name = self.display_name();
        let resp: GenerateResponse = send_json(&name, request).await?;
        response_text(resp).map_err(|message| TranscribeError::api(name, message))
    }

    /// Live list of models supporting `generateContent`, or `None`.
    pub async fn list_models(settings: &ProviderSettings) -> Option<Vec<String>> {
        let api_key = settings.google_api_key.as_ref()?;
        let client = build_client(settings.request_timeout_secs).ok()?;
        let request = client
            .get(format!(
                "{}/v1beta/models",
                settings.google_base_url.trim_end_matches('/')
            ))
            .header("x-goog-api-key", api_key);
        let list: ModelList = send_json("google", request).await.ok()?;
        let models: Vec<String> = list
            .models
            .into_iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == "generateContent"))
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect();
        (!models.is_empty()).then_some(models)
    }
}

#[async_trait]
impl VisionProvider for GoogleProvider {
    fn display_name(&self) -> String {
        let lower = self.model.to_lowercase();
        if lower.contains("pro") {
            format!("Gemini Pro ({})", self.model)
        } else if lower.contains("flash") {
            format!("Gemini Flash ({})", self.model)
        } else {
            format!("Gemini ({})", self.model)
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn transcribe_one(&self, page: &PageImage, prompt: &str) -> Result<String, TranscribeError> {
        self.call(std::slice::from_ref(page), prompt).await
    }

    async fn transcribe_batch(
        &self,
        pages: &[PageImage],
        prompt: &str,
    ) -> Result<String, TranscribeError> {
        self.call(pages, prompt).await
    }
}
