//! Confirm command - turn a reviewed receipt into an expense.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use console::style;
use rust_decimal::Decimal;
use uuid::Uuid;

use till_core::ConfirmedFields;

use super::{build_service, load_config};

/// Arguments for the confirm command.
///
/// Amount and merchant default to the values extracted from the receipt.
#[derive(Args)]
pub struct ConfirmArgs {
    /// Receipt id
    id: Uuid,

    /// Total amount
    #[arg(short, long)]
    amount: Option<Decimal>,

    /// Merchant name
    #[arg(short, long)]
    merchant: Option<String>,

    /// Expense category (default from config)
    #[arg(long)]
    category: Option<String>,

    /// Transaction date (YYYY-MM-DD or RFC 3339); defaults to the receipt date
    #[arg(short, long, value_parser = parse_date)]
    date: Option<DateTime<Utc>>,

    /// Notes stored on the transaction
    #[arg(short, long)]
    notes: Option<String>,
}

pub async fn run(args: ConfirmArgs, config_path: Option<&str>, owner: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let service = build_service(&config).await?;

    let record = service.get(owner, args.id).await?;
    let extracted = record.extracted();

    let fields = ConfirmedFields {
        amount: args.amount.or_else(|| extracted.map(|e| e.amount)),
        merchant_name: args
            .merchant
            .or_else(|| extracted.map(|e| e.merchant_name.clone())),
        category: args.category,
        date: args.date,
        description: args.notes,
    };

    let tx_ref = service
        .confirm(owner, args.id, fields)
        .await
        .with_context(|| format!("Failed to confirm receipt {}", args.id))?;

    println!(
        "{} Receipt {} linked to transaction {}",
        style("✓").green(),
        args.id,
        tx_ref.transaction_id
    );

    Ok(())
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD or RFC 3339", value))
}
