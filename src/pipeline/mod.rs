//! Pipeline stages for note transcription.
//!
//! Each submodule implements one step. The stages only meet through plain
//! data (`Document`, `GroupText`), so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! path ──▶ source ──▶ batch ──▶ postprocess ──▶ assemble ──▶ sink
//!          (pages)   (groups)   (fences)       (markers)
//! ```
//!
//! 1. [`source`]: map the extension to a format and produce page images;
//!    [`note`] and [`pdf`] run in `spawn_blocking` since both block
//! 2. [`batch`]: split pages into groups and call the provider once per
//!    group, degrading a failed batch to per-page calls
//! 3. [`postprocess`]: strip a wrapping code fence from every response
//! 4. [`assemble`]: write blocks to the sink with optional page markers
//!    and optional plain-text stripping

pub mod assemble;
pub mod batch;
pub mod note;
pub mod pdf;
pub mod postprocess;
pub mod source;
