//! Parse command - run the receipt parser on text without OCR.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;

use till_core::ReceiptParser;

use super::format_parsed_text;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Text file with OCR output ("-" reads stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: ParseFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ParseFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    let text = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        if !args.input.exists() {
            anyhow::bail!("Input file not found: {}", args.input.display());
        }
        std::fs::read_to_string(&args.input)?
    };

    let parsed = ReceiptParser::new().parse(&text);

    match args.format {
        ParseFormat::Json => println!("{}", serde_json::to_string_pretty(&parsed)?),
        ParseFormat::Text => print!("{}", format_parsed_text(&parsed)),
    }

    Ok(())
}
