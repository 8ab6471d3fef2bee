use std::path::PathBuf;

use clap::Parser;
use energy::{LogLayout, SpanMode};
use scripts::{
    cli::{init_tracing, parse_args},
    runs::plot_io_runs,
};

/// Same as `plot_io`, with one window per iteration instead of one per operation.
#[derive(Debug, Parser)]
#[command(name = "plot_io_passive")]
struct Args {
    log_dir: PathBuf,
    block_size: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.log_dir)?;
    let written = plot_io_runs(&layout, &args.block_size, SpanMode::IterationSpan);
    tracing::info!("{} plots written for block size {}", written.len(), args.block_size);
    Ok(())
}
