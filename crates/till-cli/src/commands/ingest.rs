//! Ingest command - upload receipt files and run extraction on them.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{error, warn};

use till_core::models::receipt::{MimeType, ReceiptStatus};
use till_core::{IngestOutcome, ReceiptService};

use super::{build_service, format_record_text, load_config};

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Input file or glob pattern (PDF, JPEG, PNG or GIF)
    #[arg(required = true)]
    input: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: IngestFormat,

    /// Continue with the remaining files when one fails
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum IngestFormat {
    /// JSON array of outcomes
    Json,
    /// Human-readable summary
    Text,
}

/// Outcome of one input file.
#[derive(Serialize)]
struct FileResult {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<IngestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(args: IngestArgs, config_path: Option<&str>, owner: &str) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    let service = build_service(&config).await?;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Processing {}", path.display()));

        let result = ingest_file(&service, &path, owner).await;
        pb.finish_and_clear();

        let error_msg = match &result {
            Ok(outcome) if outcome.record.status() == ReceiptStatus::Failed => Some(
                outcome
                    .record
                    .errors
                    .last()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "extraction failed".to_string()),
            ),
            Ok(_) => None,
            Err(e) => Some(format!("{:#}", e)),
        };

        if let Some(message) = &error_msg {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", path.display(), message);
            } else {
                error!("Failed to process {}: {}", path.display(), message);
                anyhow::bail!("Processing {} failed: {}", path.display(), message);
            }
        }

        results.push(FileResult {
            path,
            outcome: result.ok(),
            error: error_msg,
        });
    }

    match args.format {
        IngestFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        IngestFormat::Text => print_summary(&results, start.elapsed()),
    }

    Ok(())
}

async fn ingest_file(
    service: &ReceiptService,
    path: &Path,
    owner: &str,
) -> anyhow::Result<IngestOutcome> {
    let mime_type = MimeType::from_path(path)?;
    let bytes = tokio::fs::read(path).await?;
    let original_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("receipt");

    Ok(service
        .upload(owner, &bytes, original_name, mime_type.as_str())
        .await?)
}

fn print_summary(results: &[FileResult], elapsed: Duration) {
    for result in results {
        if let Some(outcome) = &result.outcome {
            println!("{}", format_record_text(&outcome.record));
            if outcome.needs_review && outcome.record.status() == ReceiptStatus::Completed {
                println!(
                    "{} Low confidence, review the fields before confirming.",
                    style("!").yellow()
                );
            }
            println!();
        }
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        elapsed
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
