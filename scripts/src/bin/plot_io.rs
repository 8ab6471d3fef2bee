use std::path::PathBuf;

use clap::Parser;
use energy::{LogLayout, SpanMode};
use scripts::{
    cli::{init_tracing, parse_args},
    runs::plot_io_runs,
};

/// Plots the read traces of a block size with the window of every I/O operation.
#[derive(Debug, Parser)]
#[command(name = "plot_io")]
struct Args {
    log_dir: PathBuf,
    block_size: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.log_dir)?;
    let written = plot_io_runs(&layout, &args.block_size, SpanMode::AllOperations);
    tracing::info!("{} plots written for block size {}", written.len(), args.block_size);
    Ok(())
}
