//! OCR capability used by the extraction adapter.

#[cfg(feature = "native")]
mod pure_engine;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use async_trait::async_trait;

use crate::error::OcrError;

/// Best-effort text recognition over encoded image bytes.
#[async_trait]
pub trait OcrCapability: Send + Sync {
    /// Recognize the text in `image` (PNG, JPEG or GIF bytes) using the
    /// language model named by `language`. May return an empty string.
    async fn recognize(&self, image: &[u8], language: &str) -> Result<String, OcrError>;
}
