//! Vision backends.
//!
//! [`VisionProvider`] is the seam between the batching engine and the
//! network. Each adapter encodes page images, issues one HTTP call and turns
//! the backend's stop/finish metadata into either text or a
//! [`TranscribeError::ProviderApi`]. Construction checks credentials and
//! reachability, so a misconfigured backend fails before any page is sent.
//!
//! ```text
//! "gemini-flash" ──▶ ModelSpec ──▶ create_provider ──▶ Arc<dyn VisionProvider>
//! ```

pub mod anthropic;
pub mod encode;
pub mod google;
mod http;
pub mod ollama;
pub mod spec;

pub use spec::{ModelSpec, ModelTier, ProviderKind, DEFAULT_MODEL_SPEC};

use crate::config::{ProviderSettings, TranscriptionConfig};
use crate::error::TranscribeError;
use crate::page::PageImage;
use async_trait::async_trait;
use std::sync::Arc;

/// A backend that turns page images into text.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Human-readable backend and model, e.g. "Claude Sonnet 4.5".
    fn display_name(&self) -> String;

    /// The concrete model identifier, fixed at construction.
    fn model(&self) -> &str;

    /// Whether the backend can currently take calls: a credential is held
    /// for the cloud APIs, the server answers for a local one.
    async fn is_available(&self) -> bool;

    /// Transcribe one page with one call.
    async fn transcribe_one(&self, page: &PageImage, prompt: &str) -> Result<String, TranscribeError>;

    /// Transcribe several consecutive pages with one call.
    ///
    /// The default issues one [`transcribe_one`](Self::transcribe_one) per
    /// page and joins the answers with a blank line, for backends that
    /// cannot take several images in one message.
    async fn transcribe_batch(
        &self,
        pages: &[PageImage],
        prompt: &str,
    ) -> Result<String, TranscribeError> {
        let mut parts = Vec::with_capacity(pages.len());
        for page in pages {
            parts.push(self.transcribe_one(page, prompt).await?);
        }
        Ok(parts.join("\n\n"))
    }
}

/// Build the adapter for `spec`.
///
/// The adapter samples at `config.temperature()`, so the value sent on the
/// wire is always one the config builder accepted. Async because the Ollama
/// adapter contacts its server during construction.
pub async fn create_provider(
    spec: &ModelSpec,
    settings: &ProviderSettings,
    config: &TranscriptionConfig,
) -> Result<Arc<dyn VisionProvider>, TranscribeError> {
    let provider: Arc<dyn VisionProvider> = match spec.provider {
        ProviderKind::Anthropic => Arc::new(anthropic::AnthropicProvider::new(
            settings,
            spec.model.clone(),
            spec.tier,
            config,
        )?),
        ProviderKind::Google => Arc::new(google::GoogleProvider::new(
            settings,
            spec.model.clone(),
            spec.tier,
            config,
        )?),
        ProviderKind::Ollama => Arc::new(
            ollama::OllamaProvider::connect(settings, spec.model.clone(), config).await?,
        ),
    };
    Ok(provider)
}

/// Where a model list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelListSource {
    Live,
    Static,
}

/// Models offered by `kind`: the live list when the backend answers, else a
/// built-in list (empty for Ollama, which has no fixed catalogue).
pub async fn list_models(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> (Vec<String>, ModelListSource) {
    let live = match kind {
        ProviderKind::Anthropic => anthropic::AnthropicProvider::list_models(settings).await,
        ProviderKind::Google => google::GoogleProvider::list_models(settings).await,
        ProviderKind::Ollama => ollama::OllamaProvider::list_models(settings).await,
    };
    match live {
        Some(models) => (models, ModelListSource::Live),
        None => {
            let fallback: &[&str] = match kind {
                ProviderKind::Anthropic => anthropic::KNOWN_MODELS,
                ProviderKind::Google => google::KNOWN_MODELS,
                ProviderKind::Ollama => &[],
            };
            (
                fallback.iter().map(|m| m.to_string()).collect(),
                ModelListSource::Static,
            )
        }
    }
}
