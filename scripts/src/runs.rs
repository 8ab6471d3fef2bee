//! Per-file-size work shared by the I/O plotting binaries.

use std::path::PathBuf;

use energy::{
    event::{collect_run_events, read_timestamps, BoundaryKind, TimestampFile},
    sample::PowerSample,
    Error, LogLayout, PowerTrace, SpanMode,
};
use plotters::style::RED;

use crate::render::{render_series, RenderConfig, SeriesFrame};

/// Loads the read trace of a block/file size, small category first.
///
/// A missing or unreadable trace is reported and `None` returned.
pub fn load_read_trace(
    layout: &LogLayout,
    block_size: &str,
    file_size: &str,
) -> Option<PowerTrace> {
    let Some(path) = layout.read_trace(block_size, file_size) else {
        let candidates: Vec<String> = layout
            .read_trace_candidates(block_size, file_size)
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        tracing::warn!("No read trace found among {}", candidates.join(", "));
        return None;
    };
    match PowerTrace::load_json(&path) {
        Ok(trace) => Some(trace),
        Err(e) => {
            tracing::warn!("Skipping {}: {e}", path.display());
            None
        }
    }
}

pub fn io_plot_path(
    layout: &LogLayout,
    block_size: &str,
    file_size: &str,
    mode: SpanMode,
) -> PathBuf {
    let name = match mode {
        SpanMode::AllOperations => format!("plot_io_{block_size}_{file_size}_all_run.png"),
        SpanMode::IterationSpan => format!("plot_io_{block_size}_{file_size}.png"),
    };
    layout.plot_dir(block_size).join(name)
}

/// Plots the read trace of every file size with its I/O windows. Returns the images written.
pub fn plot_io_runs(layout: &LogLayout, block_size: &str, mode: SpanMode) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for file_size in layout.file_sizes() {
        let Some(trace) = load_read_trace(layout, block_size, file_size) else {
            continue;
        };
        let timestamp_dir = layout.io_timestamp_dir();
        let events = match collect_run_events(timestamp_dir, block_size, file_size, mode) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Size {file_size} skipped: {e}");
                continue;
            }
        };

        let frame = SeriesFrame::new(
            format!(
                "Energy Consumption over Time - IO size {block_size} & buffer size {file_size}"
            ),
            format!("Wattmeter measurements during IO - {block_size}"),
            RED,
            trace.samples(),
        )
        .with_events(&events);
        let path = io_plot_path(layout, block_size, file_size, mode);
        match render_series(&path, &RenderConfig::SERIES, &frame) {
            Ok(()) => written.push(path),
            Err(e) => tracing::warn!("Size {file_size} skipped: {e:#}"),
        }
    }
    written
}

/// Samples of the idle gap between the first two iterations of a block/file size.
///
/// The gap runs from the first line of the iteration 01 end file to the first line of the
/// iteration 02 begin file, both excluded.
pub fn idle_gap<'a>(
    layout: &LogLayout,
    trace: &'a PowerTrace,
    block_size: &str,
    file_size: &str,
) -> energy::Result<&'a [PowerSample]> {
    let first_line = |kind: BoundaryKind, iteration: u32| {
        let path = layout.timestamp_file(&TimestampFile {
            kind,
            block_size: block_size.to_string(),
            buffer_size: file_size.to_string(),
            iteration,
        });
        read_timestamps(&path)?
            .first()
            .copied()
            .ok_or_else(|| Error::parse(path.display().to_string(), "empty timestamp file"))
    };
    let end_first = first_line(BoundaryKind::End, 1)?;
    let begin_second = first_line(BoundaryKind::Begin, 2)?;
    Ok(trace.between(&end_first, &begin_second))
}
