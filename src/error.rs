//! Error types for the notescribe library.
//!
//! Every fatal condition is one variant of [`TranscribeError`]. Variants are
//! grouped by the stage that produces them, and [`TranscribeError::kind`]
//! folds them into the coarse [`ErrorKind`] taxonomy that callers branch on.
//!
//! Only one failure is ever absorbed inside the library: a failed *batch*
//! call, which the batching engine degrades to per-page calls. Everything
//! else, including any failure during that per-page fallback, propagates to
//! the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`TranscribeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid settings, unknown model specifier, missing credentials or
    /// an unreachable local backend.
    Configuration,
    /// Input file missing, unreadable, corrupt or of an unsupported type.
    FileFormat,
    /// A page image could not be produced or encoded.
    ImageProcessing,
    /// A vision backend call failed or returned an abnormal completion.
    ProviderApi,
    /// The output sink rejected a write.
    Io,
    /// The run was cancelled between groups.
    Interrupted,
    /// A library fault: HTTP client setup, a panicked worker task or
    /// undecodable sink bytes.
    Internal,
}

/// All fatal errors returned by the notescribe library.
#[derive(Debug, Error)]
pub enum TranscribeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The extension does not map to any known input format.
    #[error("Unsupported file format '{extension}'. Supported formats: {supported}")]
    UnsupportedFormat { extension: String, supported: String },

    /// The file has a supported extension but its content could not be decoded.
    #[error("Cannot read '{path}': {detail}")]
    FileFormat { path: PathBuf, detail: String },

    /// The PDF engine could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium for your platform or point --pdfium-lib at an existing copy."
    )]
    PdfiumBindingFailed(String),

    /// The external note decoder program is not installed.
    #[error(
        "Note decoder '{program}' not found on PATH.\n\
Install it with: pip install supernotelib"
    )]
    NoteDecoderUnavailable { program: String },

    // ── Image errors ──────────────────────────────────────────────────────
    /// A page image is empty, has zero dimensions or failed to encode.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// The backend cannot be used at all (missing key, endpoint down,
    /// no suitable model installed).
    #[error("Provider '{provider}' is not available.\n{reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// A backend call failed, timed out or finished abnormally.
    #[error("{provider} API error: {message}")]
    ProviderApi { provider: String, message: String },

    /// A per-page call made while degrading a failed batch did not succeed.
    #[error("Page {page}: {source}")]
    Page {
        page: usize,
        #[source]
        source: Box<TranscribeError>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or model-specifier parsing failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// The sink rejected a write or flush.
    #[error("Failed to write output{}: {source}", fmt_path(.path))]
    OutputWriteFailed {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was observed before the next group started.
    #[error("Interrupted after {completed_groups}/{total_groups} page groups")]
    Interrupted {
        completed_groups: usize,
        total_groups: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" '{}'", p.display()),
        None => String::new(),
    }
}

impl TranscribeError {
    /// Shorthand for a [`TranscribeError::ProviderApi`].
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        TranscribeError::ProviderApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`TranscribeError::ProviderNotAvailable`].
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        TranscribeError::ProviderNotAvailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscribeError::FileNotFound { .. }
            | TranscribeError::UnsupportedFormat { .. }
            | TranscribeError::FileFormat { .. } => ErrorKind::FileFormat,
            TranscribeError::PdfiumBindingFailed(_)
            | TranscribeError::NoteDecoderUnavailable { .. }
            | TranscribeError::ProviderNotAvailable { .. }
            | TranscribeError::InvalidConfig(_) => ErrorKind::Configuration,
            TranscribeError::ImageProcessing(_) => ErrorKind::ImageProcessing,
            TranscribeError::Internal(_) => ErrorKind::Internal,
            TranscribeError::ProviderApi { .. } => ErrorKind::ProviderApi,
            TranscribeError::Page { source, .. } => source.kind(),
            TranscribeError::OutputWriteFailed { .. } => ErrorKind::Io,
            TranscribeError::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }
}

impl From<image::ImageError> for TranscribeError {
    fn from(e: image::ImageError) -> Self {
        TranscribeError::ImageProcessing(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_lists_supported() {
        let e = TranscribeError::UnsupportedFormat {
            extension: ".docx".into(),
            supported: ".jpeg, .jpg, .note, .pdf, .png, .webp".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(".docx"), "got: {msg}");
        assert!(msg.contains(".note, .pdf"), "got: {msg}");
        assert_eq!(e.kind(), ErrorKind::FileFormat);
    }

    #[test]
    fn page_error_inherits_kind_of_source() {
        let e = TranscribeError::Page {
            page: 4,
            source: Box::new(TranscribeError::api("Gemini", "HTTP 500")),
        };
        assert_eq!(e.kind(), ErrorKind::ProviderApi);
        assert!(e.to_string().starts_with("Page 4:"));
        assert!(e.to_string().contains("HTTP 500"));
    }

    #[test]
    fn provider_not_available_is_configuration() {
        let e = TranscribeError::unavailable("anthropic", "ANTHROPIC_API_KEY is not set");
        assert_eq!(e.kind(), ErrorKind::Configuration);
        assert!(e.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn output_write_display_with_and_without_path() {
        let with = TranscribeError::OutputWriteFailed {
            path: Some(PathBuf::from("out.md")),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        assert!(with.to_string().contains("'out.md'"));
        let without = TranscribeError::OutputWriteFailed {
            path: None,
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"),
        };
        assert_eq!(without.to_string(), "Failed to write output: closed");
        assert_eq!(without.kind(), ErrorKind::Io);
    }

    #[test]
    fn internal_is_not_an_image_error() {
        let e = TranscribeError::Internal("decode task panicked".into());
        assert_eq!(e.kind(), ErrorKind::Internal);
        assert_eq!(
            TranscribeError::ImageProcessing("bad png".into()).kind(),
            ErrorKind::ImageProcessing
        );
    }

    #[test]
    fn interrupted_display() {
        let e = TranscribeError::Interrupted {
            completed_groups: 2,
            total_groups: 5,
        };
        assert!(e.to_string().contains("2/5"));
    }
}
