use std::path::PathBuf;

use clap::Parser;
use energy::sample::{load_samples, write_baseline_csv};
use scripts::cli::{init_tracing, parse_args};

/// Converts the idle power-meter export to the baseline CSV.
#[derive(Debug, Parser)]
#[command(name = "format_baseline")]
struct Args {
    input_json_file: PathBuf,
    output_csv_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let samples = load_samples(&args.input_json_file)?;
    write_baseline_csv(&args.output_csv_file, &samples)?;
    tracing::info!(
        "Converted {} samples to {}",
        samples.len(),
        args.output_csv_file.display()
    );
    Ok(())
}
