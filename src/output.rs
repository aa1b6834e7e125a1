//! Result types produced by a transcription run.

use crate::page::PageRange;
use serde::{Deserialize, Serialize};

/// How the text of a group was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupState {
    /// A one-page group, transcribed with a single call.
    Direct,
    /// A multi-page group whose batch call succeeded.
    Batched,
    /// The batch call failed and every page was transcribed separately.
    FellBack {
        /// Rendered batch error that triggered the fallback.
        batch_error: String,
    },
}

/// The text for one page group, ready for assembly.
///
/// `text` has already had code fences removed; plain-text stripping and the
/// final trim are applied by the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupText {
    pub range: PageRange,
    pub text: String,
    pub state: GroupState,
}

impl GroupText {
    pub fn fell_back(&self) -> bool {
        matches!(self.state, GroupState::FellBack { .. })
    }
}

/// Aggregate numbers for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionSummary {
    /// Pages in the document.
    pub total_pages: usize,
    /// Groups written to the sink.
    pub groups: usize,
    /// Groups that needed the per-page fallback.
    pub fallback_groups: usize,
    /// Provider calls issued, including failed batch attempts.
    pub provider_calls: usize,
    /// Wall-clock time for the whole run.
    pub duration_ms: u64,
}
