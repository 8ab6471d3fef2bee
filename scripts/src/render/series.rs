use std::path::Path;

use anyhow::bail;
use chrono::{DateTime, FixedOffset, TimeDelta};
use energy::{timestamp::seconds_between, IoEvent, PowerSample};
use plotters::{coord::Shift, prelude::*};

use super::{
    padded_range, prepare_output, DrawResultExt, RenderConfig, FONT, GREEN, PURPLE, TITLE_SIZE,
};

/// Vertical line at an I/O boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub at: DateTime<FixedOffset>,
    pub color: RGBColor,
}

/// Begin and end markers of every operation, alternating green and purple per operation.
pub fn event_markers(events: &[IoEvent]) -> Vec<Marker> {
    events
        .iter()
        .enumerate()
        .flat_map(|(i, event)| {
            let color = if i % 2 == 0 { GREEN } else { PURPLE };
            [event.begin, event.end].map(|at| Marker { at, color })
        })
        .collect()
}

/// A power trace drawn as a line over time.
#[derive(Debug, Clone)]
pub struct SeriesFrame<'a> {
    pub title: String,
    pub label: String,
    pub color: RGBColor,
    pub samples: &'a [PowerSample],
    pub markers: Vec<Marker>,
}

impl<'a> SeriesFrame<'a> {
    pub fn new(
        title: impl Into<String>,
        label: impl Into<String>,
        color: RGBColor,
        samples: &'a [PowerSample],
    ) -> Self {
        Self {
            title: title.into(),
            label: label.into(),
            color,
            samples,
            markers: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: &[IoEvent]) -> Self {
        self.markers = event_markers(events);
        self
    }
}

/// `(seconds since origin, watts)` points of the samples.
pub(crate) fn relative_points(
    origin: &DateTime<FixedOffset>,
    samples: &[PowerSample],
) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|s| (seconds_between(origin, &s.timestamp), s.value))
        .collect()
}

pub(crate) fn time_label(origin: &DateTime<FixedOffset>, secs: f64) -> String {
    TimeDelta::try_milliseconds((secs * 1000.0).round() as i64)
        .and_then(|delta| origin.checked_add_signed(delta))
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn render_series(
    path: &Path,
    config: &RenderConfig,
    frame: &SeriesFrame,
) -> anyhow::Result<()> {
    if frame.samples.is_empty() {
        bail!("{}: no sample to plot", frame.title);
    }
    prepare_output(path)?;
    render_to!(config, path, draw_series_chart(frame))?;
    tracing::info!("Plot saved to {}", path.display());
    Ok(())
}

fn draw_series_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    frame: &SeriesFrame,
) -> anyhow::Result<()> {
    root.fill(&WHITE).drawn()?;

    let origin = frame.samples[0].timestamp;
    let points = relative_points(&origin, frame.samples);
    let marker_xs: Vec<f64> = frame
        .markers
        .iter()
        .map(|m| seconds_between(&origin, &m.at))
        .collect();

    let x_min = marker_xs.iter().copied().fold(0.0, f64::min);
    let x_max = points
        .iter()
        .map(|(x, _)| *x)
        .chain(marker_xs.iter().copied())
        .fold(x_min + 1.0, f64::max);
    let (y_min, y_max) = padded_range(
        points.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min),
        points.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&frame.title, (FONT, TITLE_SIZE).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .drawn()?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Energy Consumption (Watts)")
        .x_label_formatter(&|x| time_label(&origin, *x))
        .draw()
        .drawn()?;

    let color = frame.color;
    chart
        .draw_series(LineSeries::new(points, color))
        .drawn()?
        .label(&frame.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

    for (marker_color, label) in [(GREEN, "IO begin/end (odd)"), (PURPLE, "IO begin/end (even)")] {
        let lines: Vec<PathElement<(f64, f64)>> = frame
            .markers
            .iter()
            .zip(&marker_xs)
            .filter(|(m, _)| m.color == marker_color)
            .map(|(_, x)| PathElement::new(vec![(*x, y_min), (*x, y_max)], marker_color))
            .collect();
        if lines.is_empty() {
            continue;
        }
        chart
            .draw_series(lines)
            .drawn()?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], marker_color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .drawn()?;

    root.present().drawn()?;
    Ok(())
}
