//! Subcommands and the wiring they share.

pub mod config;
pub mod confirm;
pub mod ingest;
pub mod parse;
pub mod receipts;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use console::style;
use tracing::debug;

use till_core::models::config::TillConfig;
use till_core::models::receipt::{ParsedReceipt, ReceiptRecord, ReceiptStatus};
use till_core::{
    FileStorage, JsonStore, PdfRasterizer, PureOcrEngine, ReceiptService, TextExtractor,
};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("till")
        .join("config.json")
}

/// The explicit `--config` path, else the default location.
pub fn config_file(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load the configuration, falling back to defaults when no file exists at
/// the default location. An explicit `--config` path must exist.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<TillConfig> {
    if let Some(path) = config_path {
        return TillConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Loading config from {}", path.display());
        Ok(TillConfig::from_file(&path)?)
    } else {
        Ok(TillConfig::default())
    }
}

/// Wire up a service over the JSON store and the native OCR engine.
pub async fn build_service(config: &TillConfig) -> anyhow::Result<ReceiptService> {
    let store = Arc::new(
        JsonStore::open(&config.storage.data_dir)
            .await
            .with_context(|| {
                format!("Failed to open data directory {}", config.storage.data_dir.display())
            })?,
    );

    let ocr = Arc::new(PureOcrEngine::from_config(&config.ocr));
    let rasterizer = Arc::new(PdfRasterizer::from_config(&config.pdf));
    let extractor = TextExtractor::new(ocr, rasterizer, config);
    let files = FileStorage::from_config(&config.storage);

    Ok(ReceiptService::new(
        store.clone(),
        store,
        files,
        extractor,
        config,
    ))
}

pub fn styled_status(status: ReceiptStatus) -> String {
    let label = status.as_str();
    match status {
        ReceiptStatus::Completed => style(label).green().to_string(),
        ReceiptStatus::Linked => style(label).cyan().to_string(),
        ReceiptStatus::Failed => style(label).red().to_string(),
        ReceiptStatus::Pending | ReceiptStatus::Processing => style(label).yellow().to_string(),
    }
}

pub fn format_parsed_text(parsed: &ParsedReceipt) -> String {
    let mut output = String::new();

    output.push_str(&format!("Merchant:   {}\n", parsed.merchant_name));
    output.push_str(&format!("Amount:     {}\n", parsed.amount));
    output.push_str(&format!("Date:       {}\n", parsed.date.date_naive()));
    output.push_str(&format!("Confidence: {}%\n", parsed.confidence));

    if !parsed.items.is_empty() {
        output.push_str("Items:\n");
        for item in &parsed.items {
            output.push_str(&format!("  {:<30} {:>10} x{}\n", item.name, item.price, item.quantity));
        }
    }

    output
}

pub fn format_record_text(record: &ReceiptRecord) -> String {
    let mut output = String::new();
    let file = &record.source_file;

    output.push_str(&format!("Receipt {}\n", record.id));
    output.push_str(&format!(
        "File:       {} ({}, {} bytes)\n",
        file.original_name, file.mime_type, file.size_bytes
    ));
    output.push_str(&format!("Status:     {}\n", styled_status(record.status())));
    output.push_str(&format!(
        "Uploaded:   {}\n",
        record.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    if let Some(parsed) = record.extracted() {
        output.push_str(&format_parsed_text(parsed));
    }

    if let Some(transaction_id) = record.linked_transaction_id() {
        output.push_str(&format!("Transaction: {}\n", transaction_id));
    }

    if !record.errors.is_empty() {
        output.push_str("Errors:\n");
        for error in &record.errors {
            output.push_str(&format!(
                "  [{}] {}\n",
                error.timestamp.format("%Y-%m-%d %H:%M:%S"),
                error.message
            ));
        }
    }

    output
}

pub fn format_records_csv(records: &[ReceiptRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "id",
        "uploaded_at",
        "status",
        "original_name",
        "merchant",
        "amount",
        "date",
        "confidence",
        "transaction_id",
    ])?;

    for record in records {
        let extracted = record.extracted();
        wtr.write_record(&[
            record.id.to_string(),
            record.uploaded_at.to_rfc3339(),
            record.status().to_string(),
            record.source_file.original_name.clone(),
            extracted.map(|e| e.merchant_name.clone()).unwrap_or_default(),
            extracted.map(|e| e.amount.to_string()).unwrap_or_default(),
            extracted
                .map(|e| e.date.date_naive().to_string())
                .unwrap_or_default(),
            record.confidence_score().to_string(),
            record
                .linked_transaction_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
