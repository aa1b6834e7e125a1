//! Configuration types for transcription runs.
//!
//! Three independent groups of settings live here:
//!
//! * [`TranscriptionConfig`]: how pages are grouped, prompted and assembled.
//!   Immutable once built; construct it via [`TranscriptionConfig::builder`],
//!   whose `build()` rejects out-of-range values instead of clamping them.
//! * [`SourceOptions`]: how an input file is turned into page images.
//! * [`ProviderSettings`]: credentials, endpoints and the per-call timeout
//!   for the vision backends. [`ProviderSettings::from_env`] is the only place
//!   the library reads the process environment, and it is meant to be called
//!   once by the entry point.

use crate::error::TranscribeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default sampling temperature for every model except Gemini 3.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Default number of consecutive pages sent in one provider call.
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// Settings that govern one transcription run.
///
/// # Example
/// ```rust
/// use notescribe::TranscriptionConfig;
///
/// let config = TranscriptionConfig::builder()
///     .batch_size(2)
///     .page_separator(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionConfig {
    temperature: f32,
    batch_size: usize,
    page_separator: bool,
    additional_prompt: String,
    plain_text: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            batch_size: DEFAULT_BATCH_SIZE,
            page_separator: false,
            additional_prompt: String::new(),
            plain_text: false,
        }
    }
}

impl TranscriptionConfig {
    /// Create a new builder starting from the defaults.
    pub fn builder() -> TranscriptionConfigBuilder {
        TranscriptionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Sampling temperature forwarded to the provider. Range 0.0–2.0.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Maximum number of consecutive pages per provider call. Always ≥ 1.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether a `---- Page N ----` marker precedes each group.
    pub fn page_separator(&self) -> bool {
        self.page_separator
    }

    /// Free text appended to the base prompt. Empty means none.
    pub fn additional_prompt(&self) -> &str {
        &self.additional_prompt
    }

    /// Whether Markdown emphasis and highlight markers are removed.
    pub fn plain_text(&self) -> bool {
        self.plain_text
    }

    /// The configuration actually applied to a document.
    ///
    /// Single-image inputs are always transcribed one page per call and never
    /// carry a page marker, whatever the caller asked for.
    pub fn effective_for(&self, multipage: bool) -> Self {
        if multipage {
            self.clone()
        } else {
            Self {
                batch_size: 1,
                page_separator: false,
                ..self.clone()
            }
        }
    }
}

/// Builder for [`TranscriptionConfig`].
#[derive(Debug)]
pub struct TranscriptionConfigBuilder {
    config: TranscriptionConfig,
}

impl TranscriptionConfigBuilder {
    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    pub fn page_separator(mut self, v: bool) -> Self {
        self.config.page_separator = v;
        self
    }

    pub fn additional_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.additional_prompt = prompt.into();
        self
    }

    pub fn plain_text(mut self, v: bool) -> Self {
        self.config.plain_text = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranscriptionConfig, TranscribeError> {
        let c = &self.config;
        if !c.temperature.is_finite() || !(0.0..=2.0).contains(&c.temperature) {
            return Err(TranscribeError::InvalidConfig(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                c.temperature
            )));
        }
        if c.batch_size == 0 {
            return Err(TranscribeError::InvalidConfig(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Source options ───────────────────────────────────────────────────────

/// How input files are rasterised into page images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Resolution used when PDF pages are rendered. Default: 150.
    pub dpi: u32,

    /// Render every PDF page even when embedded images are present.
    pub force_render: bool,

    /// Embedded PDF images are only used when both sides are strictly larger
    /// than this many pixels. Default: 100.
    pub min_embedded_dimension: u32,

    /// External program used to decode tablet notebook files.
    pub note_decoder: String,

    /// Explicit libpdfium location. `None` binds the system library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            dpi: 150,
            force_render: false,
            min_embedded_dimension: 100,
            note_decoder: "supernote-tool".to_string(),
            pdfium_library: None,
        }
    }
}

impl SourceOptions {
    pub fn validate(&self) -> Result<(), TranscribeError> {
        if self.dpi == 0 || self.dpi > 1200 {
            return Err(TranscribeError::InvalidConfig(format!(
                "DPI must be 1–1200, got {}",
                self.dpi
            )));
        }
        if self.note_decoder.trim().is_empty() {
            return Err(TranscribeError::InvalidConfig(
                "note decoder program must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// ── Provider settings ────────────────────────────────────────────────────

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Credentials and endpoints for the vision backends.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub google_base_url: String,
    pub ollama_base_url: String,
    /// Upper bound on a single provider call, in seconds. Default: 120.
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            google_api_key: None,
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            google_base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ProviderSettings {
    /// Read `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY`, `OLLAMA_BASE_URL` and
    /// `NOTESCRIBE_REQUEST_TIMEOUT` from the environment.
    ///
    /// Empty variables count as unset.
    pub fn from_env() -> Result<Self, TranscribeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TranscribeError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self {
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            ..Self::default()
        };
        if let Some(url) = get("OLLAMA_BASE_URL") {
            settings.ollama_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("NOTESCRIBE_REQUEST_TIMEOUT") {
            settings.request_timeout_secs = secs.trim().parse().map_err(|_| {
                TranscribeError::InvalidConfig(format!(
                    "NOTESCRIBE_REQUEST_TIMEOUT must be a whole number of seconds, got '{secs}'"
                ))
            })?;
        }
        if settings.request_timeout_secs == 0 {
            return Err(TranscribeError::InvalidConfig(
                "request timeout must be at least 1 second".into(),
            ));
        }
        Ok(settings)
    }
}

fn redact(key: &Option<String>) -> &'static str {
    match key {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("google_base_url", &self.google_base_url)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = TranscriptionConfig::default();
        assert_eq!(c.temperature(), 0.2);
        assert_eq!(c.batch_size(), 3);
        assert!(!c.page_separator());
        assert_eq!(c.additional_prompt(), "");
        assert!(!c.plain_text());
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        let err = TranscriptionConfig::builder()
            .temperature(2.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("2.5"), "got: {err}");
        assert!(TranscriptionConfig::builder().temperature(-0.1).build().is_err());
        assert!(TranscriptionConfig::builder()
            .temperature(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn builder_accepts_bounds() {
        assert!(TranscriptionConfig::builder().temperature(0.0).build().is_ok());
        assert!(TranscriptionConfig::builder().temperature(2.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_zero_batch() {
        let err = TranscriptionConfig::builder().batch_size(0).build().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn effective_for_single_image_forces_one_page_and_no_marker() {
        let c = TranscriptionConfig::builder()
            .batch_size(5)
            .page_separator(true)
            .plain_text(true)
            .build()
            .unwrap();
        let single = c.effective_for(false);
        assert_eq!(single.batch_size(), 1);
        assert!(!single.page_separator());
        assert!(single.plain_text());
        assert_eq!(c.effective_for(true), c);
    }

    #[test]
    fn source_options_validate() {
        assert!(SourceOptions::default().validate().is_ok());
        let bad = SourceOptions {
            dpi: 0,
            ..SourceOptions::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn settings_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("ANTHROPIC_API_KEY", "sk-ant-123"),
            ("GOOGLE_API_KEY", ""),
            ("OLLAMA_BASE_URL", "http://gpu-box:11434/"),
            ("NOTESCRIBE_REQUEST_TIMEOUT", "30"),
        ]
        .into_iter()
        .collect();
        let s = ProviderSettings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.anthropic_api_key.as_deref(), Some("sk-ant-123"));
        assert_eq!(s.google_api_key, None);
        assert_eq!(s.ollama_base_url, "http://gpu-box:11434");
        assert_eq!(s.request_timeout_secs, 30);
    }

    #[test]
    fn settings_reject_bad_timeout() {
        assert!(ProviderSettings::from_lookup(|k| {
            (k == "NOTESCRIBE_REQUEST_TIMEOUT").then(|| "soon".to_string())
        })
        .is_err());
    }

    #[test]
    fn settings_debug_redacts_keys() {
        let s = ProviderSettings {
            google_api_key: Some("AIza-secret".into()),
            ..ProviderSettings::default()
        };
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("AIza-secret"));
        assert!(dbg.contains("<set>"));
    }
}
