//! Error types for the till-core library.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::models::receipt::ReceiptStatus;

/// Main error type for the till library.
#[derive(Error, Debug)]
pub enum TillError {
    /// Declared MIME type is not one of the accepted receipt formats.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// OCR or rasterization failed.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Caller-supplied data failed validation.
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Receipt is missing or owned by another user.
    #[error("receipt not found: {0}")]
    NotFound(Uuid),

    /// Receipt is not in a state that allows the operation.
    #[error("receipt {id} is {status}, expected completed")]
    Conflict { id: Uuid, status: ReceiptStatus },

    /// State machine rejected a transition.
    #[error("invalid receipt transition from {from} to {to}")]
    InvalidTransition {
        from: ReceiptStatus,
        to: ReceiptStatus,
    },

    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TillError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while turning a stored file into raw text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// OCR engine failure.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// PDF rasterization failure.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// The whole extraction took longer than the configured limit.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Reading the source file or the raster failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine has no recognizer for the requested language.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Errors related to PDF rasterization.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// No raster content could be recovered from the page.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// Writing the raster failed.
    #[error("failed to write raster: {0}")]
    Render(String),
}

/// Errors from the receipt and transaction stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document does not decode to a record.
    #[error("corrupt document at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Result type for the till library.
pub type Result<T> = std::result::Result<T, TillError>;
