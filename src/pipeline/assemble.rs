//! Output assembly: join group texts into one document on a sink.
//!
//! Each block is written as soon as its group finishes, so a file or stdout
//! sink always holds every completed group even if a later group fails. The
//! string sink is the same code writing into a `Vec<u8>`, which keeps both
//! modes byte-identical.
//!
//! Layout, for groups `g1..gn`:
//!
//! ```text
//! [marker(g1)\n]text(g1)\n\n[marker(g2)\n]text(g2) ... text(gn)\n
//! ```

use crate::error::TranscribeError;
use crate::output::GroupText;
use crate::pipeline::postprocess;
use std::io::Write;

/// Writes group blocks in order and terminates the document.
#[derive(Debug)]
pub struct Assembler {
    page_separator: bool,
    plain_text: bool,
    written: usize,
}

impl Assembler {
    pub fn new(page_separator: bool, plain_text: bool) -> Self {
        Self {
            page_separator,
            plain_text,
            written: 0,
        }
    }

    /// Number of blocks written so far.
    pub fn blocks_written(&self) -> usize {
        self.written
    }

    /// The text of `group` as it will appear in the document, without marker.
    pub fn render_text(&self, group: &GroupText) -> String {
        if self.plain_text {
            postprocess::strip_markdown_formatting(&group.text)
                .trim()
                .to_string()
        } else {
            group.text.trim().to_string()
        }
    }

    /// Write one block and flush it. Returns the number of text characters written.
    pub fn write_block<W: Write + ?Sized>(
        &mut self,
        sink: &mut W,
        group: &GroupText,
    ) -> Result<usize, TranscribeError> {
        let text = self.render_text(group);

        let mut block = String::with_capacity(text.len() + 32);
        if self.written > 0 {
            block.push_str("\n\n");
        }
        if self.page_separator {
            block.push_str(&group.range.marker());
            block.push('\n');
        }
        block.push_str(&text);

        sink.write_all(block.as_bytes())
            .and_then(|_| sink.flush())
            .map_err(sink_error)?;
        self.written += 1;
        Ok(text.chars().count())
    }

    /// Write the single trailing newline and flush.
    pub fn finish<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<(), TranscribeError> {
        sink.write_all(b"\n")
            .and_then(|_| sink.flush())
            .map_err(sink_error)
    }
}

fn sink_error(source: std::io::Error) -> TranscribeError {
    TranscribeError::OutputWriteFailed { path: None, source }
}
