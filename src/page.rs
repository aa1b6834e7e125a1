//! Page images and page ranges.

use crate::error::TranscribeError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A raster page image with non-zero width and height.
///
/// The only way to build one is [`PageImage::new`], so every image that
/// reaches a provider has already been checked.
#[derive(Clone)]
pub struct PageImage(DynamicImage);

impl PageImage {
    pub fn new(image: DynamicImage) -> Result<Self, TranscribeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TranscribeError::ImageProcessing(format!(
                "page image has zero dimension ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    pub fn into_inner(self) -> DynamicImage {
        self.0
    }
}

impl fmt::Debug for PageImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageImage({}x{})", self.width(), self.height())
    }
}

/// A contiguous, 1-indexed, inclusive range of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    /// `first` and `last` are 1-indexed; `first <= last` is required.
    pub fn new(first: usize, last: usize) -> Self {
        debug_assert!(first >= 1 && first <= last, "invalid page range {first}-{last}");
        Self { first, last }
    }

    pub fn single(page: usize) -> Self {
        Self::new(page, page)
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    /// The 0-indexed slice bounds of this range within a page sequence.
    pub fn indices(&self) -> Range<usize> {
        (self.first - 1)..self.last
    }

    /// 1-indexed page numbers in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = usize> {
        self.first..=self.last
    }

    /// The marker line written before this group when page separators are on.
    pub fn marker(&self) -> String {
        if self.is_single() {
            format!("---- Page {} ----", self.first)
        } else {
            format!("---- Pages {}-{} ----", self.first, self.last)
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "page {}", self.first)
        } else {
            write!(f, "pages {}-{}", self.first, self.last)
        }
    }
}
