//! Offline builder for `processor_price_table.json`.
//!
//! Reads the launch dataset CSV, averages the plausible launch prices per
//! processor and writes the scaled table the service loads at startup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use device_price_predictor::feature_preprocessing::processor_price_table::{ProcessorPriceTable, clean_launch_price};

#[derive(Parser, Debug)]
#[command(name = "build_price_table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build the processor -> scaled launch price table", long_about = None)]
struct Args {
    /// Launch dataset CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON table
    #[arg(short, long, default_value = "models/processor_price_table.json")]
    output: PathBuf,

    /// Column holding the processor name
    #[arg(long, default_value = "Processor")]
    processor_column: String,

    /// Column holding the launch price in USD
    #[arg(long, default_value = "Launched Price (USA)")]
    price_column: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// (processor, launch price) pairs; rows with an unparseable price are skipped.
fn read_launch_records(path: &Path, processor_column: &str, price_column: &str) -> Result<Vec<(String, f64)>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader.byte_headers().context("failed to read CSV headers")?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == name)
            .ok_or_else(|| anyhow!("column {:?} not found in {}", name, path.display()))
    };
    let processor_idx = position(processor_column)?;
    let price_idx = position(price_column)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    // Byte records: the public launch datasets are not always valid UTF-8
    for (line, row) in reader.byte_records().enumerate() {
        let row = row.with_context(|| format!("malformed CSV row {}", line + 2))?;
        let processor = row.get(processor_idx).map(String::from_utf8_lossy).unwrap_or_default();
        let price = row
            .get(price_idx)
            .and_then(|cell| clean_launch_price(&String::from_utf8_lossy(cell)));
        match price {
            Some(price) => records.push((processor.trim().to_string(), price)),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} rows with an unparseable launch price", skipped);
    }
    Ok(records)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let records = read_launch_records(&args.input, &args.processor_column, &args.price_column)?;
    info!("Read {} priced rows from {}", records.len(), args.input.display());

    let table = ProcessorPriceTable::from_launch_records(records);
    if table.is_empty() {
        return Err(anyhow!("no processor had a launch price within the valid range"));
    }
    table
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("Wrote {} processors to {}", table.len(), args.output.display());
    Ok(())
}
