//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the till pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TillConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// PDF rasterization configuration.
    pub pdf: PdfConfig,

    /// Upload and record storage locations.
    pub storage: StorageConfig,

    /// Review and confirmation defaults.
    pub review: ReviewConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language model requested from the OCR engine.
    pub language: String,

    /// Upper bound for one extraction (rasterization + OCR), in seconds.
    pub timeout_secs: u64,

    /// Keep `[UNK]` markers emitted by the recognizer instead of blanking them.
    pub keep_unk: bool,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            timeout_secs: 60,
            keep_unk: false,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// PDF rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Minimum length in pixels of the raster's longer side.
    pub min_raster_size: u32,

    /// Largest raster side in pixels; upscaling stops here.
    pub max_raster_size: u32,

    /// Page fed to OCR (1-indexed).
    pub page: u32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            min_raster_size: 2000,
            max_raster_size: 6000,
            page: 1,
        }
    }
}

/// Upload and record storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded receipt files are written to.
    pub upload_dir: PathBuf,

    /// Directory holding receipt and transaction documents.
    pub data_dir: PathBuf,

    /// Largest accepted upload in bytes.
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads/receipts"),
            data_dir: PathBuf::from("data"),
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// Review and confirmation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Receipts scoring below this are flagged for manual review.
    pub needs_review_threshold: u8,

    /// Category used when a confirmation does not name one.
    pub default_category: String,

    /// Page size used when a listing asks for zero items.
    pub default_page_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            needs_review_threshold: 70,
            default_category: "Other".to_string(),
            default_page_size: 10,
        }
    }
}

impl TillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
