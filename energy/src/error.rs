use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },
    #[error("schema error in {what}: {reason}")]
    Schema { what: String, reason: String },
    #[error("instant {instant} is outside of the power trace [{first}, {last}]")]
    OutOfRange {
        instant: DateTime<FixedOffset>,
        first: DateTime<FixedOffset>,
        last: DateTime<FixedOffset>,
    },
    #[error("power trace is empty, cannot evaluate instant {instant}")]
    EmptyTrace { instant: DateTime<FixedOffset> },
    #[error("mismatch between {what}: {begin} begin vs {end} end")]
    Mismatch {
        what: String,
        begin: usize,
        end: usize,
    },
    #[error("directory {0} is locked by another run")]
    Locked(PathBuf),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

impl Error {
    pub fn parse(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn schema(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
