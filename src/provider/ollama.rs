//! Ollama local vision provider (`/api/chat`).
//!
//! Construction probes `/api/tags`: an unreachable server fails immediately,
//! and when no model is named the installed models are searched for a
//! vision-capable one.

use super::encode::encode_pages;
use super::http::{build_client, send_json};
use super::VisionProvider;
use crate::config::{ProviderSettings, TranscriptionConfig};
use crate::error::TranscribeError;
use crate::page::PageImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const PREFERRED_MODEL: &str = "qwen2.5-vl:7b";

/// Substrings that mark an installed model as vision-capable, in priority order.
pub const VISION_KEYWORDS: &[&str] = &[
    PREFERRED_MODEL,
    "qwen2.5-vl",
    "qwen",
    "llama3.2-vision",
    "llava",
    "minicpm",
    "gemma3",
    "vision",
    "ocr",
    "nanonets",
];

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

// ── Ollama API request/response types ───────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
    images: Vec<&'a str>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

fn response_text(resp: ChatResponse) -> Result<String, String> {
    match resp.done_reason.as_deref() {
        None | Some("stop") => {}
        Some("length") => {
            return Err(
                "response truncated at the context length; try a smaller --batch-size".into(),
            )
        }
        Some(other) => return Err(format!("generation stopped with done_reason={other}")),
    }
    let text = resp.message.map(|m| m.content).unwrap_or_default();
    if text.trim().is_empty() {
        return Err("model returned an empty response".into());
    }
    Ok(text)
}

/// The preferred model if installed, else the first installed model whose
/// name contains any other vision keyword.
pub fn detect_vision_model(installed: &[String]) -> Option<String> {
    installed
        .iter()
        .find(|name| name.to_lowercase().contains(PREFERRED_MODEL))
        .or_else(|| {
            installed.iter().find(|name| {
                let lower = name.to_lowercase();
                VISION_KEYWORDS[1..].iter().any(|kw| lower.contains(kw))
            })
        })
        .cloned()
}

fn is_vision_model(name: &str) -> bool {
    let lower = name.to_lowercase();
    VISION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

async fn installed_models(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<String>, TranscribeError> {
    let tags: TagList = send_json("ollama", client.get(format!("{base_url}/api/tags"))).await?;
    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

// ── Provider implementation ─────────────────────────────────────────────────

impl OllamaProvider {
    /// Connect to the server and resolve the model.
    ///
    /// Fails with `ProviderNotAvailable` when the server cannot be reached or
    /// no model was named and none of the installed ones is vision-capable.
    pub async fn connect(
        settings: &ProviderSettings,
        model: Option<String>,
        config: &TranscriptionConfig,
    ) -> Result<Self, TranscribeError> {
        let temperature = config.temperature();
        let base_url = settings.ollama_base_url.trim_end_matches('/').to_string();
        let client = build_client(settings.request_timeout_secs)?;

        let installed = installed_models(&client, &base_url).await.map_err(|e| {
            TranscribeError::unavailable(
                "ollama",
                format!("Ollama server not reachable at {base_url} ({e}). Start it with: ollama serve"),
            )
        })?;

        let model = match model {
            Some(model) => {
                info!("Using specified Ollama model: {model}");
                model
            }
            None => {
                let detected = detect_vision_model(&installed).ok_or_else(|| {
                    TranscribeError::unavailable(
                        "ollama",
                        format!("No vision models found in Ollama. Install one with: ollama pull {PREFERRED_MODEL}"),
                    )
                })?;
                info!("Auto-detected Ollama model: {detected}");
                detected
            }
        };

        info!("Using Ollama ({model}) with temperature={temperature}");
        Ok(Self {
            client,
            base_url,
            model,
            temperature,
        })
    }

    async fn call(&self, pages: &[PageImage], prompt: &str) -> Result<String, TranscribeError> {
        let images = encode_pages(pages)?;
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: images.iter().map(|img| img.data.as_str()).collect(),
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        debug!("Ollama: sending {} image(s) to {}", pages.len(), self.model);
        let request = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body);
        let name = self.display_name();
        let resp: ChatResponse = send_json(&name, request).await?;
        response_text(resp).map_err(|message| TranscribeError::api(name, message))
    }

    /// Installed vision-capable models, or `None` when the server is unreachable.
    pub async fn list_models(settings: &ProviderSettings) -> Option<Vec<String>> {
        let client = build_client(settings.request_timeout_secs).ok()?;
        let base_url = settings.ollama_base_url.trim_end_matches('/');
        let installed = installed_models(&client, base_url).await.ok()?;
        Some(installed.into_iter().filter(|m| is_vision_model(m)).collect())
    }
}

#[async_trait]
impl VisionProvider for OllamaProvider {
    fn display_name(&self) -> String {
        format!("Ollama ({})", self.model)
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// Re-probes `/api/tags`; the server may have stopped since `connect`.
    async fn is_available(&self) -> bool {
        installed_models(&self.client, &self.base_url).await.is_ok()
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
