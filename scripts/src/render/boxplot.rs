use std::path::Path;

use anyhow::bail;
use plotters::{coord::Shift, prelude::*};

use super::{
    padded_range, prepare_output, DrawResultExt, RenderConfig, FONT, PALETTE, TITLE_SIZE,
};

/// One box of a box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
}

impl BoxGroup {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }
}

/// Quartiles and whiskers of one group. Outliers are not kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

/// Linear-interpolated percentile of sorted values, `p` in `[0, 1]`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

impl BoxStats {
    /// Whiskers reach the most extreme values within 1.5 IQR of the box.
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 0.25);
        let median = percentile(&sorted, 0.5);
        let q3 = percentile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|v| *v >= low_fence)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= high_fence)
            .unwrap_or(q3);

        Some(Self {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
        })
    }
}

/// Renders one box per non-empty group, colored in palette order.
///
/// Fails without writing anything when every group is empty.
pub fn render_boxplot(
    path: &Path,
    config: &RenderConfig,
    title: &str,
    groups: &[BoxGroup],
) -> anyhow::Result<()> {
    let boxes: Vec<(&str, BoxStats)> = groups
        .iter()
        .filter_map(|group| match BoxStats::new(&group.values) {
            Some(stats) => Some((group.label.as_str(), stats)),
            None => {
                tracing::warn!("{title}: no value for {}, box skipped", group.label);
                None
            }
        })
        .collect();
    if boxes.is_empty() {
        bail!("{title}: nothing to plot");
    }

    prepare_output(path)?;
    render_to!(config, path, draw_boxes(title, &boxes))?;
    tracing::info!("Boxplot saved to {}", path.display());
    Ok(())
}

fn draw_boxes<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    title: &str,
    boxes: &[(&str, BoxStats)],
) -> anyhow::Result<()> {
    root.fill(&WHITE).drawn()?;

    let min = boxes
        .iter()
        .map(|(_, s)| s.lower_whisker)
        .fold(f64::INFINITY, f64::min);
    let max = boxes
        .iter()
        .map(|(_, s)| s.upper_whisker)
        .fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = padded_range(min, max);
    let x_max = boxes.len() as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)
        .drawn()?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .y_desc("Watt")
        .draw()
        .drawn()?;

    let label_style = (FONT, 16).into_font().color(&BLACK);
    chart
        .draw_series(boxes.iter().enumerate().map(|(idx, (label, _))| {
            Text::new(
                label.to_string(),
                (idx as f64 + 0.45, y_min + (y_max - y_min) * 0.01),
                label_style.clone(),
            )
        }))
        .drawn()?;

    let half_width = 0.3;
    let half_cap = 0.15;
    for (idx, (_, stats)) in boxes.iter().enumerate() {
        let center = idx as f64 + 0.5;
        let color = PALETTE[idx % PALETTE.len()];

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(center - half_width, stats.q1), (center + half_width, stats.q3)],
                color.filled(),
            )))
            .drawn()?;
        chart
            .draw_series([
                // box outline
                PathElement::new(
                    vec![
                        (center - half_width, stats.q1),
                        (center + half_width, stats.q1),
                        (center + half_width, stats.q3),
                        (center - half_width, stats.q3),
                        (center - half_width, stats.q1),
                    ],
                    BLACK,
                ),
                PathElement::new(
                    vec![(center - half_width, stats.median), (center + half_width, stats.median)],
                    BLACK.stroke_width(2),
                ),
                PathElement::new(vec![(center, stats.q1), (center, stats.lower_whisker)], BLACK),
                PathElement::new(vec![(center, stats.q3), (center, stats.upper_whisker)], BLACK),
                PathElement::new(
                    vec![
                        (center - half_cap, stats.lower_whisker),
                        (center + half_cap, stats.lower_whisker),
                    ],
                    BLACK,
                ),
                PathElement::new(
                    vec![
                        (center - half_cap, stats.upper_whisker),
                        (center + half_cap, stats.upper_whisker),
                    ],
                    BLACK,
                ),
            ])
            .drawn()?;
    }

    root.present().drawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_stats() {
        let stats = BoxStats::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(
            stats,
            BoxStats {
                lower_whisker: 1.0,
                q1: 2.0,
                median: 3.0,
                q3: 4.0,
                upper_whisker: 5.0,
            }
        );

        // 100.0 lies beyond q3 + 1.5 IQR and is left out of the whiskers
        let stats = BoxStats::new(&[10.0, 11.0, 12.0, 13.0, 100.0]).unwrap();
        assert_eq!(stats.median, 12.0);
        assert_eq!(stats.upper_whisker, 13.0);
        assert_eq!(stats.lower_whisker, 10.0);
    }

    #[test]
    fn test_box_stats_interpolates_quartiles() {
        let stats = BoxStats::new(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(stats.q1, 1.75);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.q3, 3.25);

        let single = BoxStats::new(&[80.0]).unwrap();
        assert_eq!(single.lower_whisker, 80.0);
        assert_eq!(single.upper_whisker, 80.0);
    }

    #[test]
    fn test_box_stats_empty() {
        assert_eq!(BoxStats::new(&[]), None);
        assert_eq!(BoxStats::new(&[f64::NAN]), None);
    }

    #[test]
    fn test_render_boxplot_rejects_empty_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("box_plot/boxplot_1G.png");
        let groups = vec![BoxGroup::new("4K", vec![]), BoxGroup::new("64K", vec![])];
        assert!(render_boxplot(&path, &RenderConfig::BOXPLOT, "empty", &groups).is_err());
        assert!(!path.exists());
    }
}
