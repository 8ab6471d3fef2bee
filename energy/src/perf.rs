use std::{fs::OpenOptions, path::Path};

use chrono::{DateTime, FixedOffset};

use crate::{
    atomic::write_atomically,
    error::{Error, Result},
    event::{pair_events, read_timestamps, IoEvent},
    interpolate::EnergyEstimate,
    sample::PowerTrace,
    timestamp::{format_instant, parse_instant},
};

pub const PERF_CSV_COLUMNS: &[&str] = &[
    "iteration",
    "timestamp_begin",
    "timestamp_end",
    "duration (s)",
];
pub const ENERGY_CSV_COLUMNS: &[&str] = &["begin_energy (J)", "end_energy (J)"];
pub const MEAN_CSV_COLUMN: &str = "energy_mean (J)";

/// One benchmarked I/O operation and what is known about its energy.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfRecord {
    pub iteration: u32,
    pub timestamp_begin: DateTime<FixedOffset>,
    pub timestamp_end: DateTime<FixedOffset>,
    pub duration_secs: f64,
    pub begin_energy: Option<f64>,
    pub end_energy: Option<f64>,
    pub energy_mean: Option<f64>,
    /// Cells of columns this crate does not know about, in table order.
    pub extra: Vec<String>,
}

impl PerfRecord {
    pub fn from_event(iteration: u32, event: &IoEvent) -> Self {
        Self {
            iteration,
            timestamp_begin: event.begin,
            timestamp_end: event.end,
            duration_secs: event.duration_secs(),
            begin_energy: None,
            end_energy: None,
            energy_mean: None,
            extra: Vec::new(),
        }
    }

    pub fn event(&self) -> IoEvent {
        IoEvent::new(self.timestamp_begin, self.timestamp_end)
    }

    pub fn set_energy(&mut self, estimate: Option<EnergyEstimate>) {
        self.begin_energy = estimate.map(|e| e.begin);
        self.end_energy = estimate.map(|e| e.end);
    }

    /// `|begin - end| - mean`, when both energies are known.
    pub fn delta(&self) -> Option<f64> {
        let (begin, end) = (self.begin_energy?, self.end_energy?);
        Some((begin - end).abs() - (begin + end) / 2.0)
    }

    fn energy_mean_or_derived(&self) -> Option<f64> {
        self.energy_mean
            .or_else(|| Some((self.begin_energy? + self.end_energy?) / 2.0))
    }

    fn as_csv_record(&self, columns: &PerfColumns) -> Vec<String> {
        let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();

        let mut record = vec![
            self.iteration.to_string(),
            format_instant(&self.timestamp_begin),
            format_instant(&self.timestamp_end),
            self.duration_secs.to_string(),
        ];
        record.extend(self.extra.iter().cloned());
        if columns.energy {
            record.push(cell(self.begin_energy));
            record.push(cell(self.end_energy));
        }
        if columns.mean {
            record.push(cell(self.energy_mean));
        }
        record
    }
}

/// Which column groups a perf table carries besides the base columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfColumns {
    pub extra: Vec<String>,
    pub energy: bool,
    pub mean: bool,
}

impl PerfColumns {
    fn header(&self) -> Vec<&str> {
        let mut header = PERF_CSV_COLUMNS.to_vec();
        header.extend(self.extra.iter().map(String::as_str));
        if self.energy {
            header.extend_from_slice(ENERGY_CSV_COLUMNS);
        }
        if self.mean {
            header.push(MEAN_CSV_COLUMN);
        }
        header
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerfTable {
    pub columns: PerfColumns,
    pub records: Vec<PerfRecord>,
}

/// Outcome of a row-by-row pass over a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
}

impl PerfTable {
    pub fn new(records: Vec<PerfRecord>) -> Self {
        Self {
            columns: PerfColumns::default(),
            records,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let what = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let mut base = [0; 4];
        for (slot, name) in base.iter_mut().zip(PERF_CSV_COLUMNS) {
            *slot = position(*name)
                .ok_or_else(|| Error::schema(what.clone(), format!("missing column {name:?}")))?;
        }
        let energy = match (position(ENERGY_CSV_COLUMNS[0]), position(ENERGY_CSV_COLUMNS[1])) {
            (Some(begin), Some(end)) => Some((begin, end)),
            (None, None) => None,
            _ => {
                return Err(Error::schema(
                    what,
                    "begin and end energy columns must come together",
                ))
            }
        };
        let mean = position(MEAN_CSV_COLUMN);

        let known: Vec<usize> = base
            .iter()
            .copied()
            .chain(energy.into_iter().flat_map(|(b, e)| [b, e]))
            .chain(mean)
            .collect();
        let extra_idx: Vec<usize> = (0..headers.len()).filter(|i| !known.contains(i)).collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
            let number = |idx: usize| -> Result<Option<f64>> {
                let s = cell(idx);
                if s.is_empty() || s.eq_ignore_ascii_case("nan") {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|e| Error::parse(format!("{what} row {row}"), e))
            };

            let iteration = cell(base[0])
                .parse::<u32>()
                .map_err(|e| Error::parse(format!("{what} row {row}"), e))?;
            let duration_secs = number(base[3])?.ok_or_else(|| {
                Error::parse(format!("{what} row {row}"), "missing duration")
            })?;
            let (begin_energy, end_energy) = match energy {
                Some((b, e)) => (number(b)?, number(e)?),
                None => (None, None),
            };
            records.push(PerfRecord {
                iteration,
                timestamp_begin: parse_instant(cell(base[1]))?,
                timestamp_end: parse_instant(cell(base[2]))?,
                duration_secs,
                begin_energy,
                end_energy,
                energy_mean: mean.map(&number).transpose()?.flatten(),
                extra: extra_idx.iter().map(|&i| cell(i).to_string()).collect(),
            });
        }

        Ok(Self {
            columns: PerfColumns {
                extra: extra_idx.iter().map(|&i| headers[i].to_string()).collect(),
                energy: energy.is_some(),
                mean: mean.is_some(),
            },
            records,
        })
    }

    /// Rewrites the table at `path`, replacing any previous content.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_atomically(path, |file| {
            let mut wtr = csv::Writer::from_writer(file);
            wtr.write_record(self.columns.header())?;
            for record in &self.records {
                wtr.write_record(record.as_csv_record(&self.columns))?;
            }
            wtr.flush().map_err(|e| Error::io(path, e))
        })
    }

    /// Interpolates begin/end energy of every row against `trace`.
    ///
    /// A row that cannot be estimated gets missing energies; the other rows are still processed.
    pub fn annotate_energy(&mut self, trace: &PowerTrace) -> BatchReport {
        let mut report = BatchReport::default();
        for (idx, record) in self.records.iter_mut().enumerate() {
            tracing::debug!(
                "Processing row {idx} with begin {} and end {}",
                format_instant(&record.timestamp_begin),
                format_instant(&record.timestamp_end)
            );
            match trace.estimate(&record.event()) {
                Ok(estimate) => {
                    record.set_energy(Some(estimate));
                    report.processed += 1;
                }
                Err(e) => {
                    tracing::warn!("Error processing row {idx}: {e}");
                    record.set_energy(None);
                    report.failed += 1;
                }
            }
        }
        self.columns.energy = true;
        if self.columns.mean {
            self.recompute_mean();
        }
        report
    }

    /// Appends the `energy_mean (J)` column as the mean of begin and end energy.
    pub fn derive_mean(&mut self) -> Result<()> {
        if !self.columns.energy {
            return Err(Error::schema(
                "perf table",
                format!("missing columns {ENERGY_CSV_COLUMNS:?}"),
            ));
        }
        self.recompute_mean();
        self.columns.mean = true;
        Ok(())
    }

    fn recompute_mean(&mut self) {
        for record in &mut self.records {
            record.energy_mean = match (record.begin_energy, record.end_energy) {
                (Some(begin), Some(end)) => Some((begin + end) / 2.0),
                _ => None,
            };
        }
    }

    /// Rows worth a detail plot: the largest delta with the mean above the end energy, the
    /// largest delta with the mean below it, and the delta closest to zero.
    pub fn select_delta_rows(&self) -> Vec<usize> {
        let candidates: Vec<(usize, f64, f64, f64)> = self
            .records
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| {
                Some((idx, r.delta()?, r.energy_mean_or_derived()?, r.end_energy?))
            })
            .collect();

        let max_delta = |above: bool| {
            candidates
                .iter()
                .filter(|(_, _, mean, end)| if above { mean > end } else { mean < end })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|c| c.0)
        };
        let closest_to_zero = candidates
            .iter()
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|c| c.0);

        let mut selected = Vec::new();
        for idx in [max_delta(true), max_delta(false), closest_to_zero]
            .into_iter()
            .flatten()
        {
            if !selected.contains(&idx) {
                selected.push(idx);
            }
        }
        selected
    }
}

/// Adds begin/end energy columns to the perf table at `perf_csv`, rewriting it in place.
pub fn annotate_perf_csv(
    energy_csv: impl AsRef<Path>,
    perf_csv: impl AsRef<Path>,
) -> Result<BatchReport> {
    let trace = PowerTrace::load_energy_csv(energy_csv)?;
    let mut table = PerfTable::read(&perf_csv)?;
    let report = table.annotate_energy(&trace);
    table.write(&perf_csv)?;
    Ok(report)
}

/// Builds the rows of one iteration from its begin and end timestamp files.
pub fn generate_perf_rows(
    begin_file: impl AsRef<Path>,
    end_file: impl AsRef<Path>,
    iteration: u32,
) -> Result<Vec<PerfRecord>> {
    let begins = read_timestamps(begin_file)?;
    let ends = read_timestamps(end_file)?;
    let events = pair_events(begins, ends, &format!("timestamps of iteration {iteration}"))?;
    Ok(events
        .iter()
        .map(|event| PerfRecord::from_event(iteration, event))
        .collect())
}

/// Appends base rows to `path`, writing the header only into an empty file.
pub fn append_perf_csv(path: impl AsRef<Path>, records: &[PerfRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    let is_empty = file.metadata().map_err(|e| Error::io(path, e))?.len() == 0;

    let columns = PerfColumns::default();
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_empty {
        wtr.write_record(columns.header())?;
    }
    for record in records {
        wtr.write_record(record.as_csv_record(&columns))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}
