use std::path::PathBuf;

use clap::Parser;
use energy::LogLayout;
use scripts::{
    cli::{init_tracing, parse_args},
    render::{render_boxplot, BoxGroup, RenderConfig},
    runs::{idle_gap, load_read_trace},
};

/// Box plot per file size of the power drawn between the first two iterations.
#[derive(Debug, Parser)]
#[command(name = "boxplot_io")]
struct Args {
    log_dir: PathBuf,
    io_size: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();
    let io_size = &args.io_size;

    let layout = LogLayout::load(&args.log_dir)?;
    let mut groups = Vec::new();
    for file_size in layout.file_sizes() {
        let Some(trace) = load_read_trace(&layout, io_size, file_size) else {
            continue;
        };
        match idle_gap(&layout, &trace, io_size, file_size) {
            Ok(gap) => groups.push(BoxGroup::new(
                file_size.as_str(),
                gap.iter().map(|s| s.value).collect(),
            )),
            Err(e) => tracing::warn!("Size {file_size} skipped: {e}"),
        }
    }

    let path = layout.box_plot_dir().join(format!("boxplot_{io_size}.png"));
    if let Err(e) = render_boxplot(
        &path,
        &RenderConfig::BOXPLOT,
        &format!("Boxplot of wattmeter measurement between IO of size {io_size}"),
        &groups,
    ) {
        tracing::warn!("Boxplot skipped: {e:#}");
    }
    Ok(())
}
