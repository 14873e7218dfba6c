use clinical_dashboard::config::{init_logging, SERVICE_LOG_FILTER};
use clinical_dashboard::generator::{self, GeneratorConfig};

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "generate_data")]
#[command(about = "Write synthetic EHR and claims CSV files for the dashboard")]
struct Args {
    /// Number of encounters (and claims) to generate
    #[arg(short, long, default_value_t = 1000)]
    records: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory (default: ./data)
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    init_logging(SERVICE_LOG_FILTER);
    let args = Args::parse();

    let config = GeneratorConfig {
        records: args.records,
        seed: args.seed,
    };
    let (encounters, claims) = generator::write_csv_files(&config, &args.out_dir)?;

    println!("Created {}", encounters.display());
    println!("Created {}", claims.display());
    Ok(())
}
