use std::path::PathBuf;

use clap::Parser;
use energy::{LogLayout, PowerTrace};
use plotters::style::BLUE;
use scripts::{
    cli::{init_tracing, parse_args},
    render::{render_series, RenderConfig, SeriesFrame},
};

#[derive(Debug, Parser)]
#[command(name = "plot_baseline")]
struct Args {
    log_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.log_dir)?;
    let baseline = layout.baseline_json();
    if !baseline.exists() {
        tracing::error!("{} does not exist", baseline.display());
        return Ok(());
    }
    let trace = PowerTrace::load_json(&baseline)?;

    let frame = SeriesFrame::new(
        "Energy Consumption over Time - Baseline",
        "Wattmeter measurements - 15 minutes - Baseline",
        BLUE,
        trace.samples(),
    );
    let path = layout.plot_dir("baseline").join("plot_baseline.png");
    if let Err(e) = render_series(&path, &RenderConfig::BASELINE_SERIES, &frame) {
        tracing::warn!("Baseline plot skipped: {e:#}");
    }
    Ok(())
}
