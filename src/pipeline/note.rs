//! Tablet notebook (`.note`) decoding.
//!
//! The notebook container is decoded by an external program. The default,
//! [`CommandNoteDecoder`], runs `supernote-tool convert -t png -a` into a
//! temporary directory and reads back one PNG per page. Anything else that
//! can turn a notebook into page images can implement [`NoteDecoder`].

use crate::error::TranscribeError;
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Blocking decoder that returns every page of a notebook, in order.
pub trait NoteDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<DynamicImage>, TranscribeError>;
}

/// [`NoteDecoder`] that shells out to a converter program.
#[derive(Debug, Clone)]
pub struct CommandNoteDecoder {
    program: String,
}

impl CommandNoteDecoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf, TranscribeError> {
        which::which(&self.program).map_err(|_| TranscribeError::NoteDecoderUnavailable {
            program: self.program.clone(),
        })
    }
}

impl NoteDecoder for CommandNoteDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<DynamicImage>, TranscribeError> {
        let program = self.locate()?;
        let format_error = |detail: String| TranscribeError::FileFormat {
            path: path.to_path_buf(),
            detail,
        };

        let temp_dir = TempDir::new().map_err(|e| format_error(format!("temp dir: {e}")))?;
        info!("Loading note file: {}", path.display());

        let output = Command::new(&program)
            .args(["convert", "-t", "png", "-a"])
            .arg(path)
            .arg(temp_dir.path().join("page.png"))
            .output()
            .map_err(|e| format_error(format!("failed to run {}: {e}", program.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format_error(format!(
                "error loading note file ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let files = collect_page_files(temp_dir.path())
            .map_err(|e| format_error(format!("reading converter output: {e}")))?;
        if files.is_empty() {
            return Err(format_error("converter produced no pages".into()));
        }
        info!("Found {} pages in note file", files.len());

        files
            .iter()
            .map(|file| {
                debug!("Reading page image {}", file.display());
                image::open(file).map_err(|e| format_error(format!("{}: {e}", file.display())))
            })
            .collect()
    }
}

static RE_PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page_(\d+)\.png$").unwrap());

/// Page files written by the converter, in page order.
///
/// Numbered outputs (`page_0.png`, `page_1.png`, ...) are sorted numerically
/// so that page 10 follows page 9. A lone `page.png` is a one-page notebook.
fn collect_page_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
    let mut unnumbered = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == "page.png" {
            unnumbered = Some(path.clone());
        } else if let Some(n) = RE_PAGE_FILE
            .captures(name)
            .and_then(|c| c[1].parse::<u32>().ok())
        {
            numbered.push((n, path.clone()));
        }
    }
    numbered.sort_by_key(|(n, _)| *n);
    let mut files: Vec<PathBuf> = numbered.into_iter().map(|(_, p)| p).collect();
    if files.is_empty() {
        files.extend(unnumbered);
    }
    Ok(files)
}
