use std::path::PathBuf;

use clap::Parser;
use energy::{merge::merge_layout, LogLayout};
use scripts::cli::{init_tracing, parse_args};

/// Merges the perf CSV fragments of every condition of a log directory.
#[derive(Debug, Parser)]
#[command(name = "merge_csv_files")]
struct Args {
    log_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.log_dir)?;
    let reports = merge_layout(&layout);
    let removed: usize = reports.iter().map(|r| r.removed.len()).sum();
    tracing::info!(
        "Merged {} perf directories, {} fragments removed",
        reports.len(),
        removed
    );
    Ok(())
}
