//! PDF page extraction via pdfium.
//!
//! ## Embedded images first
//!
//! Tablet exports and scanner output usually store each page as one large
//! bitmap. Pulling those bitmaps out directly is faster than rasterising and
//! keeps the original resolution. Small images (icons, logos, decorations)
//! are skipped. When nothing suitable is embedded, or the caller forces it,
//! every page is rendered instead.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps a C++ library that is not async-safe. All calls in
//! this module are blocking; [`crate::pipeline::source`] runs them inside
//! `tokio::task::spawn_blocking`.

use crate::config::SourceOptions;
use crate::error::TranscribeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Points per inch in PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Blocking access to the pages of a PDF file.
pub trait PdfBackend: Send + Sync {
    /// All embedded raster images strictly larger than `min_dimension` on
    /// both axes, in page order.
    fn embedded_images(
        &self,
        path: &Path,
        min_dimension: u32,
    ) -> Result<Vec<DynamicImage>, TranscribeError>;

    /// Every page rendered at `dpi`.
    fn render_pages(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, TranscribeError>;
}

/// Apply the extraction policy: embedded images unless forced or none qualify.
///
/// A failure while looking for embedded images is not fatal; it only means
/// the pages get rendered.
pub fn extract_pages(
    backend: &dyn PdfBackend,
    path: &Path,
    options: &SourceOptions,
) -> Result<Vec<DynamicImage>, TranscribeError> {
    if !options.force_render {
        match backend.embedded_images(path, options.min_embedded_dimension) {
            Ok(images) if !images.is_empty() => {
                info!("Extracted {} embedded images", images.len());
                return Ok(images);
            }
            Ok(_) => info!("No suitable embedded images found, rendering pages instead"),
            Err(e) => warn!("Could not extract embedded images ({e}), rendering pages instead"),
        }
    }
    info!("Rendering PDF pages at {} DPI", options.dpi);
    let pages = backend.render_pages(path, options.dpi)?;
    info!("Rendered {} pages", pages.len());
    Ok(pages)
}

/// [`PdfBackend`] backed by a libpdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library: Option<PathBuf>,
}

impl PdfiumBackend {
    /// `library` is a path to libpdfium; `None` binds the system library.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self { library }
    }

    fn bind(&self) -> Result<Pdfium, TranscribeError> {
        let bindings = match &self.library {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| TranscribeError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }
}

fn load_error(path: &Path, e: PdfiumError) -> TranscribeError {
    let detail = format!("{e:?}");
    let detail = if detail.to_lowercase().contains("password") {
        "PDF is encrypted and requires a password".to_string()
    } else {
        format!("not a readable PDF ({detail})")
    };
    TranscribeError::FileFormat {
        path: path.to_path_buf(),
        detail,
    }
}

impl PdfBackend for PdfiumBackend {
    fn embedded_images(
        &self,
        path: &Path,
        min_dimension: u32,
    ) -> Result<Vec<DynamicImage>, TranscribeError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| load_error(path, e))?;

        let mut images = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            for object in page.objects().iter() {
                let Some(image_object) = object.as_image_object() else {
                    continue;
                };
                match image_object.get_raw_image() {
                    Ok(image) if image.width() > min_dimension && image.height() > min_dimension => {
                        debug!(
                            "Page {}: embedded image {}x{} px",
                            index + 1,
                            image.width(),
                            image.height()
                        );
                        images.push(image);
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Page {}: skipping undecodable image: {e:?}", index + 1),
                }
            }
        }
        Ok(images)
    }

    fn render_pages(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, TranscribeError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| load_error(path, e))?;

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / PDF_POINTS_PER_INCH);

        let pages = document.pages();
        let mut results = Vec::with_capacity(pages.len() as usize);
        for (index, page) in pages.iter().enumerate() {
            let bitmap =
                page.render_with_config(&render_config)
                    .map_err(|e| TranscribeError::FileFormat {
                        path: path.to_path_buf(),
                        detail: format!("rendering page {} failed: {e:?}", index + 1),
                    })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                index + 1,
                image.width(),
                image.height()
            );
            results.push(image);
        }
        Ok(results)
    }
}
