//! Core library for receipt ingestion.
//!
//! This crate provides:
//! - Text extraction from receipt images and PDFs (OCR + page rasterization)
//! - Heuristic receipt parsing (merchant, date, total, line items) with a
//!   confidence score
//! - The receipt lifecycle (ingest, review, confirm into a transaction)
//! - File storage and record stores (in-memory and JSON documents)

pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod receipt;
pub mod service;
pub mod storage;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{ExtractionError, Result, TillError};
pub use extraction::TextExtractor;
pub use models::config::TillConfig;
pub use models::receipt::{
    MimeType, ParsedReceipt, ReceiptItem, ReceiptRecord, ReceiptState, ReceiptStatus, SourceFile,
    StoredFile,
};
pub use models::transaction::{ConfirmedFields, TransactionRecord, TransactionRef};
pub use ocr::OcrCapability;
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfRasterizer, Rasterizer};
pub use receipt::ReceiptParser;
pub use service::{IngestOutcome, Page, Pagination, ReceiptService};
pub use storage::FileStorage;
pub use store::{JsonStore, MemoryStore, ReceiptStore, TransactionLedger};
