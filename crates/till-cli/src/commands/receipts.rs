//! List, show and delete commands.

use clap::Args;
use console::style;
use uuid::Uuid;

use super::{build_service, format_record_text, format_records_csv, load_config, OutputFormat};

/// Arguments for the list command.
#[derive(Args)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Receipts per page (0 uses the configured default)
    #[arg(short, long, default_value = "0")]
    limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Arguments for the show command.
#[derive(Args)]
pub struct ShowArgs {
    /// Receipt id
    id: Uuid,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Receipt id
    id: Uuid,
}

pub async fn list(args: ListArgs, config_path: Option<&str>, owner: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = build_service(&config).await?;

    let page = service.list(owner, args.page, args.limit).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Csv => print!("{}", format_records_csv(&page.items)?),
        OutputFormat::Text => {
            if page.items.is_empty() {
                println!("{} No receipts found.", style("ℹ").blue());
            }
            for record in &page.items {
                let merchant = record
                    .extracted()
                    .map(|e| format!("{} {}", e.merchant_name, e.amount))
                    .unwrap_or_default();
                println!(
                    "{}  {}  {:<10} {:>3}%  {}  {}",
                    record.id,
                    record.uploaded_at.format("%Y-%m-%d %H:%M"),
                    super::styled_status(record.status()),
                    record.confidence_score(),
                    record.source_file.original_name,
                    merchant
                );
            }
            let p = page.pagination;
            println!();
            println!("Page {} of {} ({} receipts)", p.page, p.pages.max(1), p.total);
        }
    }

    Ok(())
}

pub async fn show(args: ShowArgs, config_path: Option<&str>, owner: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = build_service(&config).await?;

    let record = service.get(owner, args.id).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Csv => print!("{}", format_records_csv(std::slice::from_ref(&record))?),
        OutputFormat::Text => print!("{}", format_record_text(&record)),
    }

    Ok(())
}

pub async fn delete(args: DeleteArgs, config_path: Option<&str>, owner: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = build_service(&config).await?;

    service.delete(owner, args.id).await?;
    println!("{} Deleted receipt {}", style("✓").green(), args.id);

    Ok(())
}
