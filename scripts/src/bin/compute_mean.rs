use std::path::PathBuf;

use clap::Parser;
use energy::PerfTable;
use scripts::cli::{init_tracing, parse_args};

/// Adds the mean of the begin/end energy to a perf CSV.
#[derive(Debug, Parser)]
#[command(name = "compute_mean")]
struct Args {
    perf_filepath: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let mut table = PerfTable::read(&args.perf_filepath)?;
    table.derive_mean()?;
    table.write(&args.perf_filepath)?;
    tracing::info!("Energy mean added to {}", args.perf_filepath.display());
    Ok(())
}
