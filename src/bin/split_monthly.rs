//! Split a combined Q&A export into monthly Parquet files for the server.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tagtrends::splitter::split_by_month;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "split-monthly")]
#[command(about = "Split a combined tag export into one Parquet file per month")]
struct Args {
    /// Combined CSV (or Parquet) export with Date and Time columns
    input: PathBuf,

    /// Output directory for <YYYY-MM>.parquet files (default: ./monthly_data)
    #[arg(short, long, default_value = "monthly_data")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let written = split_by_month(&args.input, &args.output_dir)
        .with_context(|| format!("Failed to split {}", args.input.display()))?;

    let total: usize = written.iter().map(|f| f.rows).sum();
    info!(
        "Done creating {} monthly parquet files ({} rows) in {}",
        written.len(),
        total,
        args.output_dir.display()
    );

    Ok(())
}
