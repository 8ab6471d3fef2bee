use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, FixedOffset};
use glob::glob;

use crate::{
    error::{Error, Result},
    timestamp::{parse_instant, seconds_between},
};

/// Time window of one benchmarked I/O operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IoEvent {
    pub begin: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl IoEvent {
    pub fn new(begin: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { begin, end }
    }

    pub fn duration_secs(&self) -> f64 {
        seconds_between(&self.begin, &self.end)
    }
}

/// Reads a timestamp file: one ISO 8601 instant per line.
pub fn read_timestamps(path: impl AsRef<Path>) -> Result<Vec<DateTime<FixedOffset>>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_instant)
        .collect()
}

pub fn pair_events(
    begins: Vec<DateTime<FixedOffset>>,
    ends: Vec<DateTime<FixedOffset>>,
    what: &str,
) -> Result<Vec<IoEvent>> {
    if begins.len() != ends.len() {
        return Err(Error::Mismatch {
            what: what.to_string(),
            begin: begins.len(),
            end: ends.len(),
        });
    }
    Ok(begins
        .into_iter()
        .zip(ends)
        .map(|(begin, end)| IoEvent::new(begin, end))
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Begin,
    End,
}

impl BoundaryKind {
    fn as_str(&self) -> &'static str {
        match self {
            BoundaryKind::Begin => "begin",
            BoundaryKind::End => "end",
        }
    }
}

/// Name of a timestamp file: `io_{begin|end}_{block}_{buffer}_iteration_{NN}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFile {
    pub kind: BoundaryKind,
    pub block_size: String,
    pub buffer_size: String,
    pub iteration: u32,
}

impl TimestampFile {
    pub fn file_name(&self) -> String {
        format!(
            "io_{}_{}_{}_iteration_{:02}.json",
            self.kind.as_str(),
            self.block_size,
            self.buffer_size,
            self.iteration
        )
    }
}

impl std::str::FromStr for TimestampFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("timestamp file name {s:?}"), "unexpected format");

        let rest = s.strip_prefix("io_").ok_or_else(invalid)?;
        let (kind, rest) = if let Some(rest) = rest.strip_prefix("begin_") {
            (BoundaryKind::Begin, rest)
        } else if let Some(rest) = rest.strip_prefix("end_") {
            (BoundaryKind::End, rest)
        } else {
            return Err(invalid());
        };
        let (sizes, iteration) = rest.rsplit_once("_iteration_").ok_or_else(invalid)?;
        let iteration = iteration
            .split('.')
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let (block_size, buffer_size) = sizes.rsplit_once('_').ok_or_else(invalid)?;
        if block_size.is_empty() || buffer_size.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            kind,
            block_size: block_size.to_string(),
            buffer_size: buffer_size.to_string(),
            iteration,
        })
    }
}

/// How the timestamp files of a run are turned into windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanMode {
    /// Every line of a begin file paired with the same line of the end file.
    AllOperations,
    /// One window per iteration: first begin instant to last end instant.
    IterationSpan,
}

fn list_timestamp_files(
    dir: &Path,
    kind: BoundaryKind,
    block_size: &str,
    buffer_size: &str,
) -> Result<Vec<(TimestampFile, PathBuf)>> {
    let pattern = format!(
        "{}/io_{}_{}_{}_iteration_*",
        dir.display(),
        kind.as_str(),
        block_size,
        buffer_size
    );
    let paths = glob(&pattern).map_err(|e| Error::parse(format!("glob {pattern:?}"), e))?;

    let mut files = Vec::new();
    for path in paths.filter_map(std::result::Result::ok) {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match name.parse::<TimestampFile>() {
            Ok(file) if file.block_size == block_size && file.buffer_size == buffer_size => {
                files.push((file, path))
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring {}: {e}", path.display()),
        }
    }
    files.sort_by_key(|(file, _)| file.iteration);
    Ok(files)
}

/// Collects the I/O windows of every iteration of one block/buffer size combination.
pub fn collect_run_events(
    dir: impl AsRef<Path>,
    block_size: &str,
    buffer_size: &str,
    mode: SpanMode,
) -> Result<Vec<IoEvent>> {
    let dir = dir.as_ref();
    let begin_files = list_timestamp_files(dir, BoundaryKind::Begin, block_size, buffer_size)?;
    let end_files = list_timestamp_files(dir, BoundaryKind::End, block_size, buffer_size)?;
    if begin_files.len() != end_files.len() {
        return Err(Error::Mismatch {
            what: format!("timestamp files for {block_size}/{buffer_size}"),
            begin: begin_files.len(),
            end: end_files.len(),
        });
    }

    let mut events = Vec::new();
    for ((begin_file, begin_path), (_, end_path)) in begin_files.iter().zip(&end_files) {
        let begins = read_timestamps(begin_path)?;
        let ends = read_timestamps(end_path)?;
        match mode {
            SpanMode::AllOperations => {
                let what = format!("timestamps of iteration {}", begin_file.iteration);
                events.extend(pair_events(begins, ends, &what)?);
            }
            SpanMode::IterationSpan => match (begins.first(), ends.last()) {
                (Some(begin), Some(end)) => events.push(IoEvent::new(*begin, *end)),
                _ => {
                    return Err(Error::parse(
                        format!("iteration {}", begin_file.iteration),
                        "empty timestamp file",
                    ))
                }
            },
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<FixedOffset> {
        parse_instant(s).unwrap()
    }

    fn write_run(dir: &Path, kind: BoundaryKind, iteration: u32, lines: &[&str]) {
        let file = TimestampFile {
            kind,
            block_size: "4K".to_string(),
            buffer_size: "1G".to_string(),
            iteration,
        };
        fs::write(dir.join(file.file_name()), lines.join("\n") + "\n").unwrap();
    }

    #[test]
    fn test_timestamp_file_name() {
        let file: TimestampFile = "io_end_4K_256M_iteration_02.json".parse().unwrap();
        assert_eq!(
            file,
            TimestampFile {
                kind: BoundaryKind::End,
                block_size: "4K".to_string(),
                buffer_size: "256M".to_string(),
                iteration: 2,
            }
        );
        assert_eq!(file.file_name(), "io_end_4K_256M_iteration_02.json");

        for invalid in [
            "io_start_4K_256M_iteration_02.json",
            "io_begin_4K_iteration_02.json",
            "io_begin_4K_256M_iteration_xx.json",
            "READ_4K.json",
        ] {
            assert!(invalid.parse::<TimestampFile>().is_err(), "{invalid}");
        }
    }

    #[test]
    fn test_read_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("io_begin_4K_1G_iteration_01.json");
        fs::write(
            &path,
            "2024-06-01T10:00:02.000000+0200\n\n2024-06-01T10:00:05.500000+0200\n",
        )
        .unwrap();
        assert_eq!(
            read_timestamps(&path).unwrap(),
            vec![t("2024-06-01T10:00:02+02:00"), t("2024-06-01T10:00:05.5+02:00")]
        );
    }

    #[test]
    fn test_pair_events() {
        let events = pair_events(
            vec![t("2024-06-01T10:00:02+02:00")],
            vec![t("2024-06-01T10:00:04.5+02:00")],
            "iteration 1",
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_secs(), 2.5);

        assert!(matches!(
            pair_events(vec![t("2024-06-01T10:00:02+02:00")], vec![], "iteration 1"),
            Err(Error::Mismatch {
                begin: 1,
                end: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_collect_run_events() {
        let dir = tempfile::tempdir().unwrap();
        write_run(
            dir.path(),
            BoundaryKind::Begin,
            2,
            &["2024-06-01T10:01:00+02:00", "2024-06-01T10:01:10+02:00"],
        );
        write_run(
            dir.path(),
            BoundaryKind::End,
            2,
            &["2024-06-01T10:01:05+02:00", "2024-06-01T10:01:15+02:00"],
        );
        write_run(
            dir.path(),
            BoundaryKind::Begin,
            1,
            &["2024-06-01T10:00:00+02:00", "2024-06-01T10:00:10+02:00"],
        );
        write_run(
            dir.path(),
            BoundaryKind::End,
            1,
            &["2024-06-01T10:00:05+02:00", "2024-06-01T10:00:15+02:00"],
        );
        // Another block size must be ignored
        fs::write(
            dir.path().join("io_begin_64K_1G_iteration_01.json"),
            "2024-06-01T09:00:00+02:00\n",
        )
        .unwrap();

        let events = collect_run_events(dir.path(), "4K", "1G", SpanMode::AllOperations).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].begin, t("2024-06-01T10:00:00+02:00"));
        assert_eq!(events[3].end, t("2024-06-01T10:01:15+02:00"));

        let events = collect_run_events(dir.path(), "4K", "1G", SpanMode::IterationSpan).unwrap();
        assert_eq!(
            events,
            vec![
                IoEvent::new(t("2024-06-01T10:00:00+02:00"), t("2024-06-01T10:00:15+02:00")),
                IoEvent::new(t("2024-06-01T10:01:00+02:00"), t("2024-06-01T10:01:15+02:00")),
            ]
        );

        // An iteration without its end file
        write_run(dir.path(), BoundaryKind::Begin, 3, &["2024-06-01T10:02:00+02:00"]);
        assert!(matches!(
            collect_run_events(dir.path(), "4K", "1G", SpanMode::AllOperations),
            Err(Error::Mismatch { begin: 3, end: 2, .. })
        ));
    }
}
