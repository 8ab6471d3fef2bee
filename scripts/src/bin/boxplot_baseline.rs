use std::path::PathBuf;

use clap::Parser;
use energy::{
    sample::{load_samples_with_metric, POWER_METRIC_ID},
    LogLayout,
};
use scripts::{
    cli::{init_tracing, parse_args},
    render::{render_boxplot, BoxGroup, RenderConfig},
};

/// Box plot of the wattmeter readings of the idle baseline.
#[derive(Debug, Parser)]
#[command(name = "boxplot_baseline")]
struct Args {
    log_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let layout = LogLayout::load(&args.log_dir)?;
    let samples = load_samples_with_metric(layout.baseline_json(), POWER_METRIC_ID)?;
    let group = BoxGroup::new("baseline", samples.iter().map(|s| s.value).collect());

    let path = layout.box_plot_dir().join("boxplot_baseline.png");
    if let Err(e) = render_boxplot(
        &path,
        &RenderConfig::BASELINE_BOXPLOT,
        "Boxplot of wattmeter measurement during 15 minutes before IO",
        &[group],
    ) {
        tracing::warn!("Baseline boxplot skipped: {e:#}");
    }
    Ok(())
}
