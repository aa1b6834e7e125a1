//! Batching & fallback: split pages into groups and transcribe one group.
//!
//! Groups are contiguous runs of at most `batch_size` pages in page order.
//! A one-page group is a single `transcribe_one` call. A larger group is one
//! `transcribe_batch` call with the batch prompt; if that call fails for any
//! reason the group degrades to one `transcribe_one` per page, joined with a
//! blank line. A failure on that per-page path is returned to the caller.
//!
//! Every raw provider response passes through
//! [`postprocess::normalise_response`] exactly once before it is used.

use crate::error::TranscribeError;
use crate::output::{GroupState, GroupText};
use crate::page::{PageImage, PageRange};
use crate::pipeline::postprocess;
use crate::progress::TranscriptionProgress;
use crate::prompts;
use crate::provider::VisionProvider;
use tracing::{debug, info, warn};

/// Split `len` pages into consecutive ranges of at most `batch_size` pages.
///
/// Yields `ceil(len / batch_size)` ranges; only the last may be shorter.
pub fn partition(len: usize, batch_size: usize) -> Vec<PageRange> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| PageRange::new(start + 1, (start + batch_size).min(len)))
        .collect()
}

/// Transcribes groups of a document with one provider and one base prompt.
pub struct BatchEngine<'a> {
    provider: &'a dyn VisionProvider,
    progress: &'a dyn TranscriptionProgress,
    prompt: String,
}

impl<'a> BatchEngine<'a> {
    pub fn new(
        provider: &'a dyn VisionProvider,
        progress: &'a dyn TranscriptionProgress,
        prompt: String,
    ) -> Self {
        Self {
            provider,
            progress,
            prompt,
        }
    }

    /// Transcribe the pages of `range` from `pages` (the whole document).
    pub async fn run_group(
        &self,
        pages: &[PageImage],
        range: PageRange,
    ) -> Result<GroupText, TranscribeError> {
        let group = &pages[range.indices()];
        info!("Transcribing {range}");
        self.progress.on_group_start(range);

        if range.is_single() {
            let text = self.transcribe_page(&group[0], range.first).await?;
            return Ok(GroupText {
                range,
                text,
                state: GroupState::Direct,
            });
        }

        let batch_prompt = prompts::batch_prompt(group.len(), &self.prompt);
        match self.provider.transcribe_batch(group, &batch_prompt).await {
            Ok(raw) => {
                debug!("{range}: batch call returned {} chars", raw.len());
                Ok(GroupText {
                    range,
                    text: postprocess::normalise_response(&raw),
                    state: GroupState::Batched,
                })
            }
            Err(batch_err) => {
                warn!("Batch processing failed for {range}: {batch_err}");
                warn!("Falling back to single-page mode for {range}");
                self.progress.on_batch_fallback(range, &batch_err);

                let mut parts = Vec::with_capacity(group.len());
                for (page, image) in range.pages().zip(group) {
                    parts.push(self.transcribe_page(image, page).await?);
                }
                Ok(GroupText {
                    range,
                    text: parts.join("\n\n"),
                    state: GroupState::FellBack {
                        batch_error: batch_err.to_string(),
                    },
                })
            }
        }
    }

    async fn transcribe_page(
        &self,
        image: &PageImage,
        page: usize,
    ) -> Result<String, TranscribeError> {
        let raw = self
            .provider
            .transcribe_one(image, &self.prompt)
            .await
            .map_err(|source| TranscribeError::Page {
                page,
                source: Box::new(source),
            })?;
        Ok(postprocess::normalise_response(&raw))
    }
}
