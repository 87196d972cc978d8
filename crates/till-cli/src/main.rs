//! CLI application for receipt ingestion and review.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, confirm, ingest, parse, receipts};

/// Receipt ingestion - OCR receipts, review the extracted fields, confirm them as expenses
#[derive(Parser)]
#[command(name = "till")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Owner the receipts belong to
    #[arg(long, global = true, default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more receipt files and extract their data
    Ingest(ingest::IngestArgs),

    /// List receipts, newest first
    List(receipts::ListArgs),

    /// Show a single receipt
    Show(receipts::ShowArgs),

    /// Confirm a receipt as an expense transaction
    Confirm(confirm::ConfirmArgs),

    /// Delete a receipt and its file
    Delete(receipts::DeleteArgs),

    /// Parse receipt text without OCR
    Parse(parse::ParseArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    let owner = cli.owner.as_str();

    match cli.command {
        Commands::Ingest(args) => ingest::run(args, config_path, owner).await,
        Commands::List(args) => receipts::list(args, config_path, owner).await,
        Commands::Show(args) => receipts::show(args, config_path, owner).await,
        Commands::Confirm(args) => confirm::run(args, config_path, owner).await,
        Commands::Delete(args) => receipts::delete(args, config_path, owner).await,
        Commands::Parse(args) => parse::run(args).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
