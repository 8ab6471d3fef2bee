use std::path::PathBuf;

use clap::Parser;
use energy::{perf::annotate_perf_csv, LogLayout};
use scripts::cli::{init_tracing, parse_args};

/// Adds the interpolated begin/end energy to every perf CSV of a log directory.
#[derive(Debug, Parser)]
#[command(name = "compute_energy")]
struct Args {
    base_directory: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.base_directory)?;
    for condition in layout.conditions() {
        let energy_csv = condition.energy_csv();
        let perf_csv = condition.perf_csv();
        if !energy_csv.exists() {
            tracing::warn!("Energy file not found: {}", energy_csv.display());
            continue;
        }
        if !perf_csv.exists() {
            tracing::warn!("Perf file not found: {}", perf_csv.display());
            continue;
        }

        tracing::info!("Processing {} and {}", perf_csv.display(), energy_csv.display());
        match annotate_perf_csv(&energy_csv, &perf_csv) {
            Ok(report) => tracing::info!(
                "Updated perf data saved to {} ({} rows estimated, {} without energy)",
                perf_csv.display(),
                report.processed,
                report.failed
            ),
            Err(e) => tracing::warn!("{condition} skipped: {e}"),
        }
    }
    Ok(())
}
