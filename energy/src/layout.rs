use std::{
    fmt::Display,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::{
    error::{Error, Result},
    event::TimestampFile,
};

pub const LAYOUT_CONFIG_FILE: &str = "layout.json";
pub const ENERGY_DIR: &str = "energy";
pub const PERF_DIR: &str = "perf";
pub const ENERGY_CSV_FILE: &str = "data.csv";
pub const IO_TIMESTAMP_DIR: &str = "io_timestamp";
pub const PLOT_DIR: &str = "plot";
pub const BOX_PLOT_DIR: &str = "box_plot";

/// Top-level directories of a log directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoCategory {
    Baseline,
    SmallSizeIo,
    BigSizeIo,
}

impl IoCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            IoCategory::Baseline => "baseline",
            IoCategory::SmallSizeIo => "small_size_io",
            IoCategory::BigSizeIo => "big_size_io",
        }
    }
}

impl Display for IoCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum AccessPattern {
    #[serde(rename = "RAND")]
    Random,
    #[serde(rename = "SEQ")]
    Sequential,
}

impl Display for AccessPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessPattern::Random => "RAND",
            AccessPattern::Sequential => "SEQ",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for AccessPattern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "RAND" | "Random" => Ok(AccessPattern::Random),
            "SEQ" | "Sequential" => Ok(AccessPattern::Sequential),
            _ => Err(format!("Invalid access pattern: {}", s)),
        }
    }
}

/// Contents of an optional `layout.json` at the root of a log directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub categories: Vec<IoCategory>,
    pub access_patterns: Vec<AccessPattern>,
    pub file_sizes: Vec<String>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            categories: vec![IoCategory::SmallSizeIo, IoCategory::BigSizeIo],
            access_patterns: vec![AccessPattern::Random, AccessPattern::Sequential],
            file_sizes: ["256M", "1G", "4G"].map(String::from).to_vec(),
        }
    }
}

/// One measured benchmark condition and its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub category: IoCategory,
    pub block_size: String,
    pub access_pattern: AccessPattern,
    pub file_size: String,
    pub dir: PathBuf,
}

impl Condition {
    pub fn energy_dir(&self) -> PathBuf {
        self.dir.join(ENERGY_DIR)
    }

    pub fn perf_dir(&self) -> PathBuf {
        self.dir.join(PERF_DIR)
    }

    pub fn energy_csv(&self) -> PathBuf {
        self.energy_dir().join(ENERGY_CSV_FILE)
    }

    pub fn perf_csv_name(&self) -> String {
        format!(
            "perf_{}_buffer{}_io{}.csv",
            self.access_pattern, self.file_size, self.block_size
        )
    }

    pub fn perf_csv(&self) -> PathBuf {
        self.perf_dir().join(self.perf_csv_name())
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.category, self.block_size, self.access_pattern, self.file_size
        )
    }
}

/// Expected layout of a benchmark log directory.
#[derive(Debug, Clone)]
pub struct LogLayout {
    root: PathBuf,
    settings: LayoutSettings,
}

impl LogLayout {
    pub fn new(root: impl Into<PathBuf>, settings: LayoutSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    /// Uses `layout.json` from the root when present, the default layout otherwise.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = root.join(LAYOUT_CONFIG_FILE);
        if !config.exists() {
            return Ok(Self::new(root, LayoutSettings::default()));
        }
        let file = File::open(&config).map_err(|e| Error::io(&config, e))?;
        let settings = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::parse(config.display().to_string(), e))?;
        tracing::info!("Layout loaded from {}: {:?}", config.display(), settings);
        Ok(Self::new(root, settings))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn file_sizes(&self) -> &[String] {
        &self.settings.file_sizes
    }

    pub fn baseline_json(&self) -> PathBuf {
        self.root
            .join(IoCategory::Baseline.dir_name())
            .join("baseline.json")
    }

    /// Candidate read traces for a block/file size, in lookup order.
    pub fn read_trace_candidates(&self, block_size: &str, file_size: &str) -> Vec<PathBuf> {
        self.settings
            .categories
            .iter()
            .filter(|c| **c != IoCategory::Baseline)
            .map(|c| {
                self.root
                    .join(c.dir_name())
                    .join(format!("READ_{block_size}"))
                    .join(format!("READ_{file_size}.json"))
            })
            .collect()
    }

    pub fn read_trace(&self, block_size: &str, file_size: &str) -> Option<PathBuf> {
        self.read_trace_candidates(block_size, file_size)
            .into_iter()
            .find(|path| path.exists())
    }

    pub fn io_timestamp_dir(&self) -> PathBuf {
        self.root.join(IO_TIMESTAMP_DIR)
    }

    pub fn timestamp_file(&self, file: &TimestampFile) -> PathBuf {
        self.io_timestamp_dir().join(file.file_name())
    }

    pub fn box_plot_dir(&self) -> PathBuf {
        self.root.join(BOX_PLOT_DIR)
    }

    pub fn plot_dir(&self, name: &str) -> PathBuf {
        self.root.join(PLOT_DIR).join(name)
    }

    /// Block-size directories present on disk for `category`, sorted by name.
    ///
    /// Read-trace directories (`READ_*`) share the category directory and are skipped.
    pub fn block_sizes(&self, category: IoCategory) -> Vec<String> {
        let dir = self.root.join(category.dir_name());
        if !dir.is_dir() {
            tracing::warn!("Category directory not found: {}", dir.display());
            return Vec::new();
        }
        let mut sizes: Vec<String> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with("READ_"))
            .collect();
        sizes.sort();
        sizes
    }

    /// Every measured condition of the log directory.
    pub fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        for &category in &self.settings.categories {
            if category == IoCategory::Baseline {
                continue;
            }
            for block_size in self.block_sizes(category) {
                for &access_pattern in &self.settings.access_patterns {
                    for file_size in &self.settings.file_sizes {
                        let dir = self
                            .root
                            .join(category.dir_name())
                            .join(&block_size)
                            .join(access_pattern.to_string())
                            .join(file_size);
                        conditions.push(Condition {
                            category,
                            block_size: block_size.clone(),
                            access_pattern,
                            file_size: file_size.clone(),
                            dir,
                        });
                    }
                }
            }
        }
        conditions
    }
}
