use std::path::PathBuf;

use clap::Parser;
use energy::{PerfTable, PowerTrace};
use scripts::{
    cli::{init_tracing, parse_args},
    render::{render_detail, DetailView, RenderConfig},
};

/// Detail plots of the operations whose interpolated energy strays most from the mean.
#[derive(Debug, Parser)]
#[command(name = "plot_delta")]
struct Args {
    energy_filepath: PathBuf,
    perf_filepath: PathBuf,
    output_prefix: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args: Args = parse_args();

    let trace = PowerTrace::load_energy_csv(&args.energy_filepath)?;
    let table = PerfTable::read(&args.perf_filepath)?;

    let selected = table.select_delta_rows();
    if selected.is_empty() {
        tracing::warn!(
            "No row of {} carries begin and end energy",
            args.perf_filepath.display()
        );
    }
    for (index, row) in selected.into_iter().enumerate() {
        let record = &table.records[row];
        let view = match DetailView::new(&trace, record) {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!("Row {row} skipped: {e}");
                continue;
            }
        };
        let config = RenderConfig::DETAIL;
        let path = PathBuf::from(format!(
            "{}_{index}.{}",
            args.output_prefix,
            config.format.extension()
        ));
        let title = format!(
            "Energy Consumption Over Time with IO Timestamps - Plot {}",
            index + 1
        );
        if let Err(e) = render_detail(&path, &config, &title, &view) {
            tracing::warn!("Row {row} skipped: {e:#}");
        }
    }
    Ok(())
}
