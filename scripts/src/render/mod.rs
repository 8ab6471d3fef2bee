//! Box plots and time-series images of power traces.
//!
//! Every entry point takes an explicit [`RenderConfig`]; nothing is selected through process-wide
//! state. Empty inputs are rejected before any file is created.

use std::{fmt::Display, path::Path};

use plotters::prelude::*;

/// Runs `$draw(root, args...)` on the backend selected by the config.
macro_rules! render_to {
    ($config:expr, $path:expr, $draw:ident ( $($arg:expr),* $(,)? )) => {{
        let config: &$crate::render::RenderConfig = $config;
        match config.format {
            $crate::render::ImageFormat::Png => $draw(
                plotters::prelude::BitMapBackend::new($path, config.size()).into_drawing_area(),
                $($arg),*
            ),
            $crate::render::ImageFormat::Svg => $draw(
                plotters::prelude::SVGBackend::new($path, config.size()).into_drawing_area(),
                $($arg),*
            ),
        }
    }};
}

mod boxplot;
mod detail;
mod series;

pub use boxplot::{render_boxplot, BoxGroup};
pub use detail::{render_detail, DetailView};
pub use series::{event_markers, render_series, Marker, SeriesFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl RenderConfig {
    pub const BOXPLOT: Self = Self {
        format: ImageFormat::Png,
        width: 1200,
        height: 800,
    };
    pub const BASELINE_BOXPLOT: Self = Self {
        format: ImageFormat::Png,
        width: 1000,
        height: 600,
    };
    pub const SERIES: Self = Self {
        format: ImageFormat::Png,
        width: 1200,
        height: 800,
    };
    pub const BASELINE_SERIES: Self = Self {
        format: ImageFormat::Png,
        width: 1000,
        height: 600,
    };
    pub const DETAIL: Self = Self {
        format: ImageFormat::Svg,
        width: 800,
        height: 600,
    };

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Category colors, in order of appearance.
pub const PALETTE: [RGBColor; 3] = [
    RGBColor(128, 0, 128),
    RGBColor(255, 165, 0),
    RGBColor(0, 128, 0),
];
pub const PURPLE: RGBColor = PALETTE[0];
pub const GREEN: RGBColor = PALETTE[2];
pub const GRAY: RGBColor = RGBColor(128, 128, 128);

const FONT: &str = "sans-serif";
const TITLE_SIZE: u32 = 24;

trait DrawResultExt<T> {
    fn drawn(self) -> anyhow::Result<T>;
}

impl<T, E: Display> DrawResultExt<T> for std::result::Result<T, E> {
    fn drawn(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("drawing failed: {e}"))
    }
}

/// Makes sure the parent directory of an output image exists.
pub(crate) fn prepare_output(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Value range padded by 5% on each side, never empty.
pub(crate) fn padded_range(min: f64, max: f64) -> (f64, f64) {
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad, max + pad)
}
