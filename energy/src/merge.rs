use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use glob::glob;
use polars::prelude::*;

use crate::{
    atomic::write_atomically,
    error::{Error, Result},
    layout::LogLayout,
};

pub const LOCK_FILE: &str = ".merge.lock";

/// Exclusive claim on a directory, released on drop.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Locked(dir.to_path_buf()))
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        writeln!(file, "{}", std::process::id()).map_err(|e| Error::io(&path, e))?;
        Ok(Self { path })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to release {}: {e}", self.path.display());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub output: PathBuf,
    pub rows: usize,
    pub removed: Vec<PathBuf>,
}

fn list_fragments(dir: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.csv", dir.display());
    let mut fragments: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| Error::parse(format!("glob {pattern:?}"), e))?
        .filter_map(std::result::Result::ok)
        .filter(|path| {
            !path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("__WIP__"))
        })
        .collect();
    fragments.sort();
    // An earlier merge result keeps its rows first.
    if let Some(pos) = fragments.iter().position(|p| p == output) {
        let previous = fragments.remove(pos);
        fragments.insert(0, previous);
    }
    Ok(fragments)
}

fn read_fragment(path: &Path) -> Result<DataFrame> {
    // Every column is read as text so that rows compare exactly as written: `2` and `2.0` are
    // distinct rows.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Drops the all-null rows the reader makes of blank separator lines.
fn drop_blank_rows(df: DataFrame) -> Result<DataFrame> {
    let Some(mask) = df
        .get_columns()
        .iter()
        .map(|column| column.is_not_null())
        .reduce(|acc, filled| &acc | &filled)
    else {
        return Ok(df);
    };
    Ok(df.filter(&mask)?)
}

/// Concatenates the CSV fragments of `dir` into `dir/output_name`, dropping duplicate rows.
///
/// The merged table is durably written before any fragment is removed. Returns `None` when
/// the directory holds no fragment.
pub fn merge_fragments(dir: &Path, output_name: &str) -> Result<Option<MergeReport>> {
    let _lock = DirLock::acquire(dir)?;
    let output = dir.join(output_name);

    let fragments = list_fragments(dir, &output)?;
    if fragments.is_empty() {
        return Ok(None);
    }

    let mut dataframes: Vec<DataFrame> = Vec::with_capacity(fragments.len());
    for fragment in &fragments {
        dataframes.push(drop_blank_rows(read_fragment(fragment)?)?);
        tracing::debug!("Processed {}", fragment.display());
    }
    let df = polars::functions::concat_df_diagonal(dataframes.as_slice())?;
    let mut df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;

    write_atomically(&output, |file| {
        CsvWriter::new(file).finish(&mut df)?;
        Ok(())
    })?;
    tracing::info!("Saved {}", output.display());

    let mut removed = Vec::new();
    for fragment in fragments.into_iter().filter(|f| *f != output) {
        fs::remove_file(&fragment).map_err(|e| Error::io(&fragment, e))?;
        removed.push(fragment);
    }

    Ok(Some(MergeReport {
        output,
        rows: df.height(),
        removed,
    }))
}

/// Merges the perf fragments of every condition of `layout`.
///
/// A condition that fails is reported and skipped. Returns the merge reports of the others.
pub fn merge_layout(layout: &LogLayout) -> Vec<MergeReport> {
    let mut reports = Vec::new();
    for condition in layout.conditions() {
        let perf_dir = condition.perf_dir();
        if !perf_dir.is_dir() {
            continue;
        }
        match merge_fragments(&perf_dir, &condition.perf_csv_name()) {
            Ok(Some(report)) => {
                tracing::info!(
                    "{condition}: {} rows from {} fragment(s)",
                    report.rows,
                    report.removed.len() + 1
                );
                reports.push(report);
            }
            Ok(None) => tracing::debug!("{condition}: no CSV fragment"),
            Err(e) => tracing::warn!("{condition}: merge skipped: {e}"),
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::PerfTable;

    const HEADER: &str = "iteration,timestamp_begin,timestamp_end,duration (s)\n";

    fn row(iteration: u32, second: u32) -> String {
        format!(
            "{iteration},2024-06-01T10:00:{second:02}+00:00,2024-06-01T10:00:{:02}+00:00,1.0\n",
            second + 1
        )
    }

    fn data_rows(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_merge_drops_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("iteration_01.csv"),
            format!("{HEADER}{}{}", row(1, 0), row(1, 2)),
        )
        .unwrap();
        fs::write(
            dir.path().join("iteration_02.csv"),
            format!("{HEADER}{}{}{}", row(1, 2), row(2, 4), row(2, 4)),
        )
        .unwrap();

        let report = merge_fragments(dir.path(), "perf_RAND_buffer1G_io4K.csv")
            .unwrap()
            .unwrap();
        // union of {r0, r2} and {r2, r4}
        assert_eq!(report.rows, 3);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(data_rows(&report.output).len(), 3);
        assert!(!dir.path().join("iteration_01.csv").exists());
        assert!(!dir.path().join(LOCK_FILE).exists());

        // Re-running over the merged file keeps the same rows
        let again = merge_fragments(dir.path(), "perf_RAND_buffer1G_io4K.csv")
            .unwrap()
            .unwrap();
        assert_eq!(again.rows, 3);
        assert!(again.removed.is_empty());
    }

    #[test]
    fn test_merge_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("iteration_01.csv"),
            format!("{HEADER}{}\n\n{}\n\n", row(1, 0), row(1, 2)),
        )
        .unwrap();
        fs::write(
            dir.path().join("iteration_02.csv"),
            format!("{HEADER}{}\n\n", row(2, 4)),
        )
        .unwrap();

        let report = merge_fragments(dir.path(), "perf_SEQ_buffer1G_io4K.csv")
            .unwrap()
            .unwrap();
        assert_eq!(report.rows, 3);
        assert!(data_rows(&report.output).iter().all(|line| !line.starts_with(',')));

        let table = PerfTable::read(&report.output).unwrap();
        let iterations: Vec<u32> = table.records.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![1, 1, 2]);
    }

    #[test]
    fn test_merge_keeps_rows_with_missing_energy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.csv"),
            "iteration,timestamp_begin,timestamp_end,duration (s),begin_energy (J),end_energy (J)\n\
             1,2024-06-01T10:00:00+00:00,2024-06-01T10:00:01+00:00,1.0,,\n\
             \n\
             2,2024-06-01T10:00:02+00:00,2024-06-01T10:00:03+00:00,1.0,100.0,110.0\n",
        )
        .unwrap();

        let report = merge_fragments(dir.path(), "perf.csv").unwrap().unwrap();
        assert_eq!(report.rows, 2);
        let table = PerfTable::read(&report.output).unwrap();
        assert_eq!(table.records[0].begin_energy, None);
        assert_eq!(table.records[1].end_energy, Some(110.0));
    }

    #[test]
    fn test_merge_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(merge_fragments(dir.path(), "perf.csv").unwrap(), None);
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_merge_refuses_locked_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), format!("{HEADER}{}", row(1, 0))).unwrap();

        let lock = DirLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            merge_fragments(dir.path(), "perf.csv"),
            Err(Error::Locked(_))
        ));
        assert!(dir.path().join("a.csv").exists());

        drop(lock);
        assert!(merge_fragments(dir.path(), "perf.csv").unwrap().is_some());
    }

    #[test]
    fn test_merge_layout() {
        let dir = tempfile::tempdir().unwrap();
        let perf_dir = dir.path().join("small_size_io/4K/SEQ/1G/perf");
        fs::create_dir_all(&perf_dir).unwrap();
        fs::write(perf_dir.join("a.csv"), format!("{HEADER}{}", row(1, 0))).unwrap();
        fs::write(perf_dir.join("b.csv"), format!("{HEADER}{}", row(2, 0))).unwrap();
        // Not a perf directory of the layout
        let stray = dir.path().join("perf_notes");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("c.csv"), format!("{HEADER}{}", row(3, 0))).unwrap();

        let layout = LogLayout::load(dir.path()).unwrap();
        let reports = merge_layout(&layout);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].output, perf_dir.join("perf_SEQ_buffer1G_io4K.csv"));
        assert_eq!(reports[0].rows, 2);
        assert!(stray.join("c.csv").exists());
    }
}
