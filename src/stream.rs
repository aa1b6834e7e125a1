//! Streaming transcription API: emit groups as they complete.
//!
//! Unlike [`crate::Transcriber::transcribe_to_writer`], which assembles the
//! whole document onto a sink, [`group_stream`] yields one [`GroupText`] per
//! page group so callers can render partial results or build their own
//! layout. Groups are processed one at a time and always arrive in page
//! order.
//!
//! The stream ends after the first error. Cancellation is checked before
//! each group starts; a cancelled run yields a final
//! [`TranscribeError::Interrupted`] instead of the next group.

use crate::config::TranscriptionConfig;
use crate::error::TranscribeError;
use crate::output::GroupText;
use crate::page::{PageImage, PageRange};
use crate::pipeline::batch::{self, BatchEngine};
use crate::pipeline::source::Document;
use crate::progress::TranscriptionProgress;
use crate::prompts;
use crate::provider::VisionProvider;
use futures::stream;
use std::pin::Pin;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A boxed stream of group results, borrowing the provider and document.
pub type GroupStream<'a> = Pin<Box<dyn Stream<Item = Result<GroupText, TranscribeError>> + Send + 'a>>;

struct StreamState<'a> {
    engine: BatchEngine<'a>,
    pages: &'a [PageImage],
    groups: std::vec::IntoIter<PageRange>,
    completed: usize,
    total: usize,
    cancel: CancellationToken,
    done: bool,
}

/// The page groups `document` will be split into under `config`.
///
/// Single-image documents always form exactly one group.
pub fn plan_groups(document: &Document, config: &TranscriptionConfig) -> Vec<PageRange> {
    let config = config.effective_for(document.is_multipage());
    batch::partition(document.page_count(), config.batch_size())
}

/// Transcribe `document`, yielding each page group's text in order.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use notescribe::{group_stream, NoopProgress, TranscriptionConfig};
/// # async fn run(provider: &dyn notescribe::VisionProvider, doc: &notescribe::Document)
/// # -> Result<(), notescribe::TranscribeError> {
/// let config = TranscriptionConfig::default();
/// let cancel = tokio_util::sync::CancellationToken::new();
/// let mut groups = group_stream(provider, doc, &config, &NoopProgress, cancel);
/// while let Some(group) = groups.next().await {
///     let group = group?;
///     println!("{}: {} chars", group.range, group.text.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn group_stream<'a>(
    provider: &'a dyn VisionProvider,
    document: &'a Document,
    config: &TranscriptionConfig,
    progress: &'a dyn TranscriptionProgress,
    cancel: CancellationToken,
) -> GroupStream<'a> {
    let groups = plan_groups(document, config);
    info!(
        "Transcribing {} page(s) in {} group(s) with {}",
        document.page_count(),
        groups.len(),
        provider.display_name()
    );

    let state = StreamState {
        engine: BatchEngine::new(
            provider,
            progress,
            prompts::build_prompt(config.additional_prompt()),
        ),
        pages: &document.pages,
        total: groups.len(),
        groups: groups.into_iter(),
        completed: 0,
        cancel,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        let Some(range) = st.groups.next() else {
            return None;
        };
        if st.cancel.is_cancelled() {
            warn!(
                "Cancelled before {range} ({}/{} groups done)",
                st.completed, st.total
            );
            st.done = true;
            let err = TranscribeError::Interrupted {
                completed_groups: st.completed,
                total_groups: st.total,
            };
            return Some((Err(err), st));
        }

        let result = st.engine.run_group(st.pages, range).await;
        match result {
            Ok(_) => st.completed += 1,
            Err(_) => st.done = true,
        }
        Some((result, st))
    }))
}
