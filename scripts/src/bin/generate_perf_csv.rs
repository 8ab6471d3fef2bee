use std::path::PathBuf;

use clap::Parser;
use energy::{
    perf::{append_perf_csv, generate_perf_rows},
    Error,
};
use scripts::cli::{init_tracing, parse_args};

/// Appends the operations of one iteration to a perf CSV.
#[derive(Debug, Parser)]
#[command(name = "generate_perf_csv")]
struct Args {
    io_begin_file: PathBuf,
    io_end_file: PathBuf,
    output_csv_file: PathBuf,
    iteration: u32,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();
    tracing::debug!("Arguments: {:?}", args);

    let records = match generate_perf_rows(&args.io_begin_file, &args.io_end_file, args.iteration) {
        Ok(records) => records,
        Err(e @ Error::Mismatch { .. }) => {
            // Nothing is appended for an inconsistent iteration
            tracing::error!("Iteration {} skipped: {e}", args.iteration);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    append_perf_csv(&args.output_csv_file, &records)?;
    tracing::info!(
        "Appended {} rows of iteration {} to {}",
        records.len(),
        args.iteration,
        args.output_csv_file.display()
    );
    Ok(())
}
