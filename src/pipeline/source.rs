//! Input resolution: turn a file path into an ordered sequence of page images.
//!
//! The format is chosen from the file extension (case-insensitive) unless
//! the caller names it explicitly. Each format has its own extractor:
//!
//! | Extension | Format | Pages |
//! |-----------|--------|-------|
//! | `.note` | tablet notebook | one per notebook page |
//! | `.pdf` | PDF | embedded images or rendered pages |
//! | `.png` `.jpg` `.jpeg` `.webp` | single image | exactly one |
//!
//! Decoding is CPU-bound and blocking, so it runs under
//! `tokio::task::spawn_blocking`.

use crate::config::SourceOptions;
use crate::error::TranscribeError;
use crate::page::PageImage;
use crate::pipeline::note::{CommandNoteDecoder, NoteDecoder};
use crate::pipeline::pdf::{self, PdfBackend, PdfiumBackend};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The kind of input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    Note,
    Pdf,
    Image,
}

/// Recognised extensions, lowercase with the leading dot.
const EXTENSIONS: &[(&str, InputFormat)] = &[
    (".note", InputFormat::Note),
    (".pdf", InputFormat::Pdf),
    (".png", InputFormat::Image),
    (".jpg", InputFormat::Image),
    (".jpeg", InputFormat::Image),
    (".webp", InputFormat::Image),
];

impl InputFormat {
    /// Look up the format for a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, TranscribeError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
            .ok_or_else(|| TranscribeError::UnsupportedFormat {
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    extension
                },
                supported: supported_extensions().join(", "),
            })
    }

    /// Whether the format can hold more than one page.
    pub fn is_multipage(self) -> bool {
        matches!(self, InputFormat::Note | InputFormat::Pdf)
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputFormat::Note => "note",
            InputFormat::Pdf => "pdf",
            InputFormat::Image => "image",
        })
    }
}

/// All recognised extensions, sorted.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut exts: Vec<&str> = EXTENSIONS.iter().map(|(ext, _)| *ext).collect();
    exts.sort_unstable();
    exts
}

/// An input file decoded into page images.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub format: InputFormat,
    pub pages: Vec<PageImage>,
}

impl Document {
    /// Build a document from already-decoded images.
    ///
    /// Fails with an image-processing error when `images` is empty or any
    /// image has a zero dimension.
    pub fn from_images(
        path: impl Into<PathBuf>,
        format: InputFormat,
        images: Vec<DynamicImage>,
    ) -> Result<Self, TranscribeError> {
        if images.is_empty() {
            return Err(TranscribeError::ImageProcessing(
                "no page images to process".into(),
            ));
        }
        let pages = images
            .into_iter()
            .map(PageImage::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            path: path.into(),
            format,
            pages,
        })
    }

    pub fn is_multipage(&self) -> bool {
        self.format.is_multipage()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Resolves input files into [`Document`]s.
#[derive(Clone)]
pub struct SourceResolver {
    options: SourceOptions,
    notes: Arc<dyn NoteDecoder>,
    pdfs: Arc<dyn PdfBackend>,
}

impl fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceResolver")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SourceResolver {
    /// Resolver with the default pdfium backend and external note decoder.
    pub fn new(options: SourceOptions) -> Result<Self, TranscribeError> {
        options.validate()?;
        Ok(Self {
            notes: Arc::new(CommandNoteDecoder::new(options.note_decoder.clone())),
            pdfs: Arc::new(PdfiumBackend::new(options.pdfium_library.clone())),
            options,
        })
    }

    pub fn with_note_decoder(mut self, decoder: Arc<dyn NoteDecoder>) -> Self {
        self.notes = decoder;
        self
    }

    pub fn with_pdf_backend(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdfs = backend;
        self
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Decode `path`, picking the format from its extension.
    pub async fn resolve(&self, path: &Path) -> Result<Document, TranscribeError> {
        let format = InputFormat::from_path(path)?;
        self.resolve_as(path, format).await
    }

    /// Decode `path` as `format`, ignoring its extension.
    pub async fn resolve_as(
        &self,
        path: &Path,
        format: InputFormat,
    ) -> Result<Document, TranscribeError> {
        if !path.is_file() {
            return Err(TranscribeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        info!("Resolving {} as {format}", path.display());

        let this = self.clone();
        let owned = path.to_path_buf();
        let images = tokio::task::spawn_blocking(move || this.extract_blocking(&owned, format))
            .await
            .map_err(|e| TranscribeError::Internal(format!("decode task panicked: {e}")))??;

        let document = Document::from_images(path, format, images)?;
        debug!(
            "{}: {} page image(s)",
            path.display(),
            document.page_count()
        );
        Ok(document)
    }

    fn extract_blocking(
        &self,
        path: &Path,
        format: InputFormat,
    ) -> Result<Vec<DynamicImage>, TranscribeError> {
        match format {
            InputFormat::Note => self.notes.decode(path),
            InputFormat::Pdf => pdf::extract_pages(self.pdfs.as_ref(), path, &self.options),
            InputFormat::Image => {
                let image = image::open(path).map_err(|e| TranscribeError::FileFormat {
                    path: path.to_path_buf(),
                    detail: format!("cannot decode image: {e}"),
                })?;
                Ok(vec![image])
            }
        }
    }
}
