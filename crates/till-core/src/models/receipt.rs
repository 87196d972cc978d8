//! Receipt record and the receipt state machine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TillError};

/// Accepted receipt file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Pdf => "application/pdf",
        }
    }

    /// Whether the file can go straight to OCR.
    pub fn is_image(&self) -> bool {
        !matches!(self, Self::Pdf)
    }

    /// File extension used for stored copies.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Pdf => "pdf",
        }
    }

    /// Guess the MIME type from a file name's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "pdf" => Ok(Self::Pdf),
            _ => Err(TillError::UnsupportedFileType(format!(".{}", extension))),
        }
    }
}

impl FromStr for MimeType {
    type Err = TillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/gif" => Ok(Self::Gif),
            "application/pdf" => Ok(Self::Pdf),
            _ => Err(TillError::UnsupportedFileType(s.to_string())),
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an uploaded file as produced by the file storage layer.
///
/// The MIME type is whatever the uploader declared; it is only checked when
/// the handle is turned into a [`SourceFile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Validated source file attached to a receipt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub original_name: String,
    pub stored_path: PathBuf,
    pub mime_type: MimeType,
    pub size_bytes: u64,
}

impl TryFrom<StoredFile> for SourceFile {
    type Error = TillError;

    fn try_from(file: StoredFile) -> Result<Self> {
        Ok(Self {
            mime_type: file.mime_type.parse()?,
            original_name: file.original_name,
            stored_path: file.stored_path,
            size_bytes: file.size_bytes,
        })
    }
}

/// A single purchased line on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Structured candidate data parsed out of OCR text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub merchant_name: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub items: Vec<ReceiptItem>,
    pub raw_text: String,
    /// Heuristic quality score (0 - 100).
    pub confidence: u8,
}

/// One failed processing attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Processing status of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Linked,
}

impl ReceiptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Linked => "linked",
        }
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status together with the data that is only valid in that status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReceiptState {
    Pending,
    Processing,
    Completed {
        extracted: ParsedReceipt,
    },
    Failed,
    Linked {
        extracted: ParsedReceipt,
        linked_transaction_id: Uuid,
    },
}

impl ReceiptState {
    pub fn status(&self) -> ReceiptStatus {
        match self {
            Self::Pending => ReceiptStatus::Pending,
            Self::Processing => ReceiptStatus::Processing,
            Self::Completed { .. } => ReceiptStatus::Completed,
            Self::Failed => ReceiptStatus::Failed,
            Self::Linked { .. } => ReceiptStatus::Linked,
        }
    }
}

/// Persisted receipt entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub source_file: SourceFile,
    #[serde(flatten)]
    pub state: ReceiptState,
    #[serde(default)]
    pub errors: Vec<ProcessingError>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReceiptRecord {
    /// Create a new pending record for an uploaded file.
    pub fn new(owner_id: impl Into<String>, source_file: SourceFile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            source_file,
            state: ReceiptState::Pending,
            errors: Vec::new(),
            uploaded_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> ReceiptStatus {
        self.state.status()
    }

    pub fn extracted(&self) -> Option<&ParsedReceipt> {
        match &self.state {
            ReceiptState::Completed { extracted } | ReceiptState::Linked { extracted, .. } => {
                Some(extracted)
            }
            _ => None,
        }
    }

    /// Confidence of the extracted data, 0 when nothing was extracted.
    pub fn confidence_score(&self) -> u8 {
        self.extracted().map(|e| e.confidence).unwrap_or(0)
    }

    pub fn linked_transaction_id(&self) -> Option<Uuid> {
        match &self.state {
            ReceiptState::Linked {
                linked_transaction_id,
                ..
            } => Some(*linked_transaction_id),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// `pending -> processing`
    pub fn begin_processing(&mut self) -> Result<()> {
        self.expect(ReceiptStatus::Pending, ReceiptStatus::Processing)?;
        self.transition(ReceiptState::Processing);
        Ok(())
    }

    /// `processing -> completed`
    pub fn complete(&mut self, extracted: ParsedReceipt) -> Result<()> {
        self.expect(ReceiptStatus::Processing, ReceiptStatus::Completed)?;
        self.transition(ReceiptState::Completed { extracted });
        Ok(())
    }

    /// `processing -> failed`, recording the failure.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.expect(ReceiptStatus::Processing, ReceiptStatus::Failed)?;
        self.errors.push(ProcessingError {
            message: message.into(),
            timestamp: Utc::now(),
        });
        self.transition(ReceiptState::Failed);
        Ok(())
    }

    /// `completed -> linked`
    pub fn link(&mut self, transaction_id: Uuid) -> Result<()> {
        self.expect(ReceiptStatus::Completed, ReceiptStatus::Linked)?;
        if let ReceiptState::Completed { extracted } =
            std::mem::replace(&mut self.state, ReceiptState::Failed)
        {
            self.transition(ReceiptState::Linked {
                extracted,
                linked_transaction_id: transaction_id,
            });
        }
        Ok(())
    }

    fn expect(&self, from: ReceiptStatus, to: ReceiptStatus) -> Result<()> {
        let current = self.status();
        if current != from {
            return Err(TillError::InvalidTransition { from: current, to });
        }
        Ok(())
    }

    fn transition(&mut self, state: ReceiptState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
