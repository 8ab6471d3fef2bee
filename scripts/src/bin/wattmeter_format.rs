use std::path::PathBuf;

use clap::Parser;
use energy::sample::{load_samples, wattmeter_columns, write_wattmeter_csv};
use scripts::cli::{init_tracing, parse_args};

#[derive(Debug, Parser)]
#[command(name = "wattmeter_format")]
struct Args {
    input_json_file: PathBuf,
    output_csv_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let samples = load_samples(&args.input_json_file)?;
    write_wattmeter_csv(&args.output_csv_file, &samples)?;
    tracing::info!(
        "Converted {} samples to {} (columns: {:?})",
        samples.len(),
        args.output_csv_file.display(),
        wattmeter_columns(&args.output_csv_file)
    );
    Ok(())
}
