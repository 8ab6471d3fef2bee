use std::path::Path;

use anyhow::bail;
use chrono::{DateTime, FixedOffset, TimeDelta};
use energy::{
    timestamp::seconds_between, EnergyEstimate, Error, IoEvent, PerfRecord, PowerSample, PowerTrace,
};
use plotters::{coord::Shift, prelude::*};

use super::{
    padded_range, prepare_output,
    series::{relative_points, time_label},
    DrawResultExt, RenderConfig, FONT, GRAY, GREEN, TITLE_SIZE,
};

/// Extra trace shown on each side of the bracketing samples.
fn margin() -> TimeDelta {
    TimeDelta::milliseconds(60)
}

/// Everything drawn around one I/O operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub event: IoEvent,
    /// Last sample at or before the begin instant.
    pub a: PowerSample,
    /// First sample at or after the end instant.
    pub b: PowerSample,
    pub window: Vec<PowerSample>,
    /// Interpolated power at the end instant.
    pub projection: f64,
    pub mean: f64,
}

impl DetailView {
    pub fn new(trace: &PowerTrace, record: &PerfRecord) -> energy::Result<Self> {
        let event = record.event();
        let (Some(begin), Some(end)) = (record.begin_energy, record.end_energy) else {
            return Err(Error::schema(
                format!("perf row of iteration {}", record.iteration),
                "missing begin or end energy",
            ));
        };
        let (a, _) = trace.bracket(&event.begin)?;
        let (_, b) = trace.bracket(&event.end)?;
        let (a, b) = (*a, *b);
        let window = trace
            .within(&(a.timestamp - margin()), &(b.timestamp + margin()))
            .to_vec();

        Ok(Self {
            event,
            a,
            b,
            window,
            projection: trace.power_at(&event.end)?,
            mean: EnergyEstimate::new(begin, end).mean,
        })
    }
}

pub fn render_detail(
    path: &Path,
    config: &RenderConfig,
    title: &str,
    view: &DetailView,
) -> anyhow::Result<()> {
    if view.window.is_empty() {
        bail!("{title}: no sample around the operation");
    }
    prepare_output(path)?;
    render_to!(config, path, draw_detail(title, view))?;
    tracing::info!("Graph saved as {}", path.display());
    Ok(())
}

fn draw_detail<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    view: &DetailView,
) -> anyhow::Result<()> {
    root.fill(&WHITE).drawn()?;

    let origin: DateTime<FixedOffset> = view.window[0].timestamp;
    let x = |t: &DateTime<FixedOffset>| seconds_between(&origin, t);
    let points = relative_points(&origin, &view.window);
    let (xa, xb, x_end) = (x(&view.a.timestamp), x(&view.b.timestamp), x(&view.event.end));

    let values = points
        .iter()
        .map(|(_, y)| *y)
        .chain([view.projection, view.mean]);
    let (y_min, y_max) = padded_range(
        values.clone().fold(f64::INFINITY, f64::min),
        values.fold(f64::NEG_INFINITY, f64::max),
    );
    let x_max = points.iter().map(|(x, _)| *x).fold(xb, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max.max(1e-3), y_min..y_max)
        .drawn()?;

    chart
        .configure_mesh()
        .x_desc("Timestamp")
        .y_desc("Energy (Watt)")
        .x_label_formatter(&|x| time_label(&origin, *x))
        .draw()
        .drawn()?;

    chart
        .draw_series(LineSeries::new(points, RED.mix(0.5)))
        .drawn()?;

    chart
        .draw_series([xa, xb].map(|at| {
            PathElement::new(vec![(at, y_min), (at, y_max)], BLUE.stroke_width(2))
        }))
        .drawn()?
        .label("Bracketing samples")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    chart
        .draw_series(
            LineSeries::new([(xa, view.a.value), (xb, view.b.value)], BLACK).point_size(3),
        )
        .drawn()?
        .label("Measured power between bracketing samples")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_end, view.mean), (x_end, view.projection)],
            GRAY,
        )))
        .drawn()?;

    chart
        .draw_series(std::iter::once(Cross::new((x_end, view.projection), 5, RED)))
        .drawn()?
        .label("Projection of IO power")
        .legend(|(x, y)| Cross::new((x + 10, y), 5, RED));

    chart
        .draw_series(std::iter::once(Circle::new((x_end, view.mean), 4, GREEN.filled())))
        .drawn()?
        .label("Mean energy point")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, GREEN.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .drawn()?;

    root.present().drawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use energy::timestamp::parse_instant;

    use super::*;

    fn sample(ts: &str, value: f64) -> PowerSample {
        PowerSample {
            timestamp: parse_instant(ts).unwrap(),
            value,
        }
    }

    fn trace() -> PowerTrace {
        PowerTrace::new(vec![
            sample("2024-06-01T10:00:00.000+00:00", 90.0),
            sample("2024-06-01T10:00:00.950+00:00", 95.0),
            sample("2024-06-01T10:00:01.000+00:00", 100.0),
            sample("2024-06-01T10:00:02.000+00:00", 110.0),
            sample("2024-06-01T10:00:03.000+00:00", 130.0),
            sample("2024-06-01T10:00:03.050+00:00", 131.0),
            sample("2024-06-01T10:00:04.000+00:00", 140.0),
        ])
        .unwrap()
    }

    fn record(begin: &str, end: &str) -> PerfRecord {
        let event = IoEvent::new(parse_instant(begin).unwrap(), parse_instant(end).unwrap());
        let mut record = PerfRecord::from_event(1, &event);
        record.set_energy(trace().estimate(&event).ok());
        record
    }

    #[test]
    fn test_detail_view() {
        let record = record("2024-06-01T10:00:01.500+00:00", "2024-06-01T10:00:02.500+00:00");
        let view = DetailView::new(&trace(), &record).unwrap();

        assert_eq!(view.a.value, 100.0);
        assert_eq!(view.b.value, 130.0);
        // within 60ms of A and B
        let values: Vec<f64> = view.window.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![95.0, 100.0, 110.0, 130.0, 131.0]);
        assert_eq!(view.projection, 120.0);
        // (105 + 120) / 2
        assert_eq!(view.mean, 112.5);
    }

    #[test]
    fn test_detail_view_requires_energy() {
        let mut record = record("2024-06-01T10:00:01.500+00:00", "2024-06-01T10:00:02.500+00:00");
        record.end_energy = None;
        assert!(matches!(
            DetailView::new(&trace(), &record),
            Err(Error::Schema { .. })
        ));
    }
}
