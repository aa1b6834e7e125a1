//! Whole-document transcription onto a sink.
//!
//! [`Transcriber`] ties the pieces together: it plans the page groups, pulls
//! them through [`crate::stream::group_stream`] and hands each finished group
//! to the [`Assembler`], which writes and flushes it immediately. A failure
//! in a later group therefore never loses text that was already written.

use crate::config::TranscriptionConfig;
use crate::error::TranscribeError;
use crate::output::{GroupState, GroupText, TranscriptionSummary};
use crate::pipeline::assemble::Assembler;
use crate::pipeline::source::Document;
use crate::progress::{NoopProgress, ProgressCallback};
use crate::provider::VisionProvider;
use crate::stream::{self, GroupStream};
use futures::StreamExt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs transcriptions with one provider and one configuration.
///
/// # Example
/// ```rust,no_run
/// use notescribe::{
///     create_provider, ModelSpec, ProviderSettings, SourceOptions, SourceResolver,
///     Transcriber, TranscriptionConfig,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = ProviderSettings::from_env()?;
/// let spec = ModelSpec::parse("gemini-flash")?;
/// let config = TranscriptionConfig::builder()
///     .temperature(spec.default_temperature())
///     .build()?;
/// let provider = create_provider(&spec, &settings, &config).await?;
///
/// let document = SourceResolver::new(SourceOptions::default())?
///     .resolve("notebook.note".as_ref())
///     .await?;
/// let transcriber = Transcriber::new(provider, config);
/// let text = transcriber
///     .transcribe_to_string(&document, &CancellationToken::new())
///     .await?;
/// print!("{text}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Transcriber {
    provider: Arc<dyn VisionProvider>,
    config: TranscriptionConfig,
    progress: ProgressCallback,
}

impl Transcriber {
    pub fn new(provider: Arc<dyn VisionProvider>, config: TranscriptionConfig) -> Self {
        Self {
            provider,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Attach a progress observer.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &TranscriptionConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn VisionProvider {
        self.provider.as_ref()
    }

    /// Stream group texts without assembling them.
    pub fn stream<'a>(&'a self, document: &'a Document, cancel: CancellationToken) -> GroupStream<'a> {
        stream::group_stream(
            self.provider.as_ref(),
            document,
            &self.config,
            self.progress.as_ref(),
            cancel,
        )
    }

    /// Transcribe `document` and write the assembled text to `sink`.
    ///
    /// Each group is written and flushed as soon as it completes. On error
    /// the sink holds every group finished before the failure, but no
    /// trailing newline.
    pub async fn transcribe_to_writer<W: Write + ?Sized>(
        &self,
        document: &Document,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionSummary, TranscribeError> {
        let start = Instant::now();
        let config = self.config.effective_for(document.is_multipage());
        let total_groups = stream::plan_groups(document, &config).len();
        debug!(
            "Effective config for {} input: {:?}",
            document.format, config
        );

        self.progress
            .on_transcription_start(document.page_count(), total_groups);

        let mut assembler = Assembler::new(config.page_separator(), config.plain_text());
        let mut summary = TranscriptionSummary {
            total_pages: document.page_count(),
            ..TranscriptionSummary::default()
        };

        let mut groups = stream::group_stream(
            self.provider.as_ref(),
            document,
            &config,
            self.progress.as_ref(),
            cancel.clone(),
        );
        while let Some(group) = groups.next().await {
            let group = group?;
            let chars = assembler.write_block(sink, &group)?;
            record(&mut summary, &group);
            self.progress.on_group_complete(group.range, chars);
        }
        assembler.finish(sink)?;

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Transcription complete: {} page(s), {} group(s), {} fallback(s), {} provider call(s), {}ms",
            summary.total_pages,
            summary.groups,
            summary.fallback_groups,
            summary.provider_calls,
            summary.duration_ms
        );
        self.progress.on_transcription_complete(&summary);
        Ok(summary)
    }

    /// Transcribe `document` into a `String`.
    ///
    /// Produces exactly the bytes [`transcribe_to_writer`](Self::transcribe_to_writer)
    /// would write.
    pub async fn transcribe_to_string(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<String, TranscribeError> {
        let mut buf: Vec<u8> = Vec::new();
        self.transcribe_to_writer(document, &mut buf, cancel).await?;
        String::from_utf8(buf).map_err(|e| TranscribeError::Internal(format!("non-UTF-8 output: {e}")))
    }

    /// Transcribe `document` into the file at `path`, creating parent directories.
    ///
    /// The file is written incrementally, so an interrupted run leaves the
    /// groups completed so far on disk.
    pub async fn transcribe_to_file(
        &self,
        document: &Document,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionSummary, TranscribeError> {
        let with_path = |source: std::io::Error| TranscribeError::OutputWriteFailed {
            path: Some(path.to_path_buf()),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(with_path)?;
        }
        let file = File::create(path).map_err(with_path)?;
        let mut sink = BufWriter::new(file);

        match self.transcribe_to_writer(document, &mut sink, cancel).await {
            Err(TranscribeError::OutputWriteFailed { path: None, source }) => Err(with_path(source)),
            other => {
                sink.flush().map_err(with_path)?;
                other
            }
        }
    }
}

fn record(summary: &mut TranscriptionSummary, group: &GroupText) {
    summary.groups += 1;
    summary.provider_calls += match group.state {
        GroupState::Direct | GroupState::Batched => 1,
        GroupState::FellBack { .. } => 1 + group.range.len(),
    };
    if group.fell_back() {
        summary.fallback_groups += 1;
    }
}
