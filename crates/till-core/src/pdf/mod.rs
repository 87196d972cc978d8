//! PDF rasterization for OCR.

mod rasterizer;

pub use rasterizer::PdfRasterizer;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Turns one page of a PDF into an image file OCR can read.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `page` (1-indexed) of the PDF at `pdf_path` into `out_dir` and
    /// return the path of the written image. The caller owns `out_dir` and
    /// everything in it.
    async fn rasterize(&self, pdf_path: &Path, page: u32, out_dir: &Path) -> Result<PathBuf>;
}
