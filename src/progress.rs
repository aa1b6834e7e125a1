//! Progress-callback trait for group-level transcription events.
//!
//! Pass an [`Arc<dyn TranscriptionProgress>`] to
//! [`crate::Transcriber::with_progress`] to observe a run as it moves from
//! group to group. The CLI renders these events as a progress bar; library
//! users can forward them anywhere.
//!
//! Groups are processed strictly in order, so events for one run never
//! interleave. Implementations still need to be `Send + Sync` because the
//! transcriber is shared across tasks.

use crate::error::TranscribeError;
use crate::output::TranscriptionSummary;
use crate::page::PageRange;
use std::sync::Arc;

/// Observer for a transcription run. Every method defaults to a no-op.
pub trait TranscriptionProgress: Send + Sync {
    /// Called once after the document has been split into groups.
    fn on_transcription_start(&self, total_pages: usize, total_groups: usize) {
        let _ = (total_pages, total_groups);
    }

    /// Called just before the first provider call of a group.
    fn on_group_start(&self, range: PageRange) {
        let _ = range;
    }

    /// Called when a batch call failed and the group degrades to per-page calls.
    fn on_batch_fallback(&self, range: PageRange, error: &TranscribeError) {
        let _ = (range, error);
    }

    /// Called after a group's text has been written to the sink.
    ///
    /// `chars` is the length of the text as written.
    fn on_group_complete(&self, range: PageRange, chars: usize) {
        let _ = (range, chars);
    }

    /// Called once after the trailing newline has been written.
    fn on_transcription_complete(&self, summary: &TranscriptionSummary) {
        let _ = summary;
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgress;

impl TranscriptionProgress for NoopProgress {}

pub type ProgressCallback = Arc<dyn TranscriptionProgress>;
