//! Text extraction adapter: stored receipt file in, raw OCR text out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::config::TillConfig;
use crate::models::receipt::SourceFile;
use crate::ocr::OcrCapability;
use crate::pdf::Rasterizer;

type Result<T> = std::result::Result<T, ExtractionError>;

/// Routes images straight to OCR and PDFs through the rasterizer first.
pub struct TextExtractor {
    ocr: Arc<dyn OcrCapability>,
    rasterizer: Arc<dyn Rasterizer>,
    language: String,
    timeout: Duration,
    page: u32,
}

impl TextExtractor {
    pub fn new(
        ocr: Arc<dyn OcrCapability>,
        rasterizer: Arc<dyn Rasterizer>,
        config: &TillConfig,
    ) -> Self {
        Self {
            ocr,
            rasterizer,
            language: config.ocr.language.clone(),
            timeout: config.ocr.timeout(),
            page: config.pdf.page.max(1),
        }
    }

    /// Override the extraction time limit.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract the text of a receipt file.
    ///
    /// PDFs are rasterized into a temporary directory that is removed before
    /// this returns, whatever the outcome.
    pub async fn extract_text(&self, file: &SourceFile) -> Result<String> {
        let work = async {
            if file.mime_type.is_image() {
                self.recognize_file(&file.stored_path).await
            } else {
                self.extract_pdf(&file.stored_path).await
            }
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout(self.timeout)),
        }
    }

    async fn recognize_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        debug!("Running OCR on {} ({} bytes)", path.display(), bytes.len());
        Ok(self.ocr.recognize(&bytes, &self.language).await?)
    }

    async fn extract_pdf(&self, pdf_path: &Path) -> Result<String> {
        // Dropping the guard (timeout, error) still removes the directory
        let scratch = tempfile::Builder::new().prefix("till-raster-").tempdir()?;

        let result = async {
            let raster = self
                .rasterizer
                .rasterize(pdf_path, self.page, scratch.path())
                .await?;
            self.recognize_file(&raster).await
        }
        .await;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to remove raster directory {}: {}", scratch_path.display(), e);
        }

        result
    }
}
