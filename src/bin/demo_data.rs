//! Demo Dataset Generator
//!
//! Writes the synthetic drill-hole dataset as CSV to stdout, in the column
//! layout `deviation train --data` reads back.
//!
//! # Usage
//! ```bash
//! ./demo-data --rows 1000 --seed 42 > demo.csv
//! ./deviation train --data demo.csv
//! ```

use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drillhole_deviation::demo::{self, DEFAULT_DEMO_ROWS, DEFAULT_DEMO_SEED};
use drillhole_deviation::ingest;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "demo-data")]
#[command(about = "Synthetic drill-hole deviation dataset as CSV")]
#[command(version)]
struct Args {
    /// Number of holes to generate
    #[arg(short, long, default_value_t = DEFAULT_DEMO_ROWS)]
    rows: usize,

    /// Random seed for reproducibility
    #[arg(short, long, default_value_t = DEFAULT_DEMO_SEED)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let dataset = demo::generate(args.rows, args.seed);

    let mut out = BufWriter::new(io::stdout().lock());
    ingest::write_csv(&dataset, &mut out).context("Failed to write CSV to stdout")?;
    out.flush().context("Failed to flush stdout")?;

    info!(rows = dataset.len(), seed = args.seed, "Demo dataset written");
    Ok(())
}
