//! # notescribe
//!
//! Transcribe handwritten notes to Markdown using Vision Language Models.
//!
//! Tablet notebooks (`.note`), scanned PDFs and single page images are turned
//! into an ordered list of page images, sent to a vision backend a few pages
//! at a time, and reassembled into one document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .note / .pdf / .png
//!  │
//!  ├─ 1. Source    decode pages (note decoder, pdfium, image; spawn_blocking)
//!  ├─ 2. Group     split into runs of `batch_size` consecutive pages
//!  ├─ 3. VLM       one call per group: Claude / Gemini / Ollama
//!  │               a failed batch call degrades to one call per page
//!  ├─ 4. Polish    strip a wrapping ```markdown fence from each response
//!  └─ 5. Assemble  optional page markers and plain-text mode; each group is
//!                  written and flushed as soon as it completes
//! ```
//!
//! Groups are transcribed strictly one after another, so output order never
//! depends on network timing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notescribe::{
//!     create_provider, ModelSpec, ProviderSettings, SourceOptions, SourceResolver,
//!     Transcriber, TranscriptionConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Keys come from ANTHROPIC_API_KEY / GOOGLE_API_KEY
//!     let settings = ProviderSettings::from_env()?;
//!     let spec = ModelSpec::parse("claude")?;
//!     let config = TranscriptionConfig::builder()
//!         .temperature(spec.default_temperature())
//!         .batch_size(2)
//!         .page_separator(true)
//!         .build()?;
//!     let provider = create_provider(&spec, &settings, &config).await?;
//!
//!     let resolver = SourceResolver::new(SourceOptions::default())?;
//!     let document = resolver.resolve("journal.pdf".as_ref()).await?;
//!     let summary = Transcriber::new(provider, config)
//!         .transcribe_to_file(&document, "journal.md".as_ref(), &CancellationToken::new())
//!         .await?;
//!     eprintln!("{} pages, {} provider calls", summary.total_pages, summary.provider_calls);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notescribe` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notescribe = { version = "0.3", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Specifier | Backend | Notes |
//! |-----------|---------|-------|
//! | `gemini-flash` | Google | Default; Gemini 3 Flash, fast and cheap |
//! | `gemini`, `gemini-pro` | Google | Gemini 3 Pro, best on messy handwriting |
//! | `claude`, `claude-sonnet` | Anthropic | Claude Sonnet |
//! | `claude-haiku` | Anthropic | Claude Haiku |
//! | `ollama` | local | Auto-detects an installed vision model |
//! | `provider:model` | any | Exact model id, e.g. `ollama:llava:13b` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod stream;
pub mod transcribe;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProviderSettings, SourceOptions, TranscriptionConfig, TranscriptionConfigBuilder};
pub use error::{ErrorKind, TranscribeError};
pub use output::{GroupState, GroupText, TranscriptionSummary};
pub use page::{PageImage, PageRange};
pub use pipeline::source::{supported_extensions, Document, InputFormat, SourceResolver};
pub use progress::{NoopProgress, ProgressCallback, TranscriptionProgress};
pub use provider::{create_provider, list_models, ModelListSource, ModelSpec, ProviderKind, VisionProvider};
pub use stream::{group_stream, GroupStream};
pub use transcribe::Transcriber;
