use std::{fs::File, io::BufReader, path::Path};

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    timestamp::{format_instant, parse_instant, serde_instant},
};

/// Metric identifier of the wattmeter power readings in the monitoring exports.
pub const POWER_METRIC_ID: &str = "wattmetre_power_watt";

pub const BASELINE_CSV_COLUMNS: &[&str] = &["timestamp (format: ISO8601)", "value (unit: watt)"];
pub const WATTMETER_CSV_COLUMNS: &[&str] = &["timestamp", "value"];
pub const ENERGY_CSV_COLUMNS: &[&str] = &["timestamp", "value (Watt)"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSample {
    pub timestamp: DateTime<FixedOffset>,
    /// Watts
    pub value: f64,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    #[serde(deserialize_with = "serde_instant::deserialize")]
    timestamp: DateTime<FixedOffset>,
    value: f64,
    #[serde(default)]
    metric_id: Option<String>,
}

impl From<RawSample> for PowerSample {
    fn from(raw: RawSample) -> Self {
        Self {
            timestamp: raw.timestamp,
            value: raw.value,
        }
    }
}

fn read_raw_samples(path: &Path) -> Result<Vec<RawSample>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::parse(path.display().to_string(), e))
}

/// Loads power-meter samples from a JSON array, in file order.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<PowerSample>> {
    Ok(read_raw_samples(path.as_ref())?
        .into_iter()
        .map(PowerSample::from)
        .collect())
}

/// Same as [`load_samples`], keeping only the records tagged with `metric_id`.
pub fn load_samples_with_metric(
    path: impl AsRef<Path>,
    metric_id: &str,
) -> Result<Vec<PowerSample>> {
    Ok(read_raw_samples(path.as_ref())?
        .into_iter()
        .filter(|raw| raw.metric_id.as_deref() == Some(metric_id))
        .map(PowerSample::from)
        .collect())
}

/// Power samples ordered by non-decreasing timestamp.
#[derive(Debug, Clone, Default)]
pub struct PowerTrace {
    samples: Vec<PowerSample>,
}

impl PowerTrace {
    pub fn new(samples: Vec<PowerSample>) -> Result<Self> {
        Self::checked(samples, "power trace")
    }

    fn checked(samples: Vec<PowerSample>, what: &str) -> Result<Self> {
        if let Some(idx) = samples
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(Error::schema(
                what,
                format!(
                    "timestamps must be non-decreasing, sample {} ({}) precedes sample {} ({})",
                    idx,
                    format_instant(&samples[idx].timestamp),
                    idx + 1,
                    format_instant(&samples[idx + 1].timestamp),
                ),
            ));
        }
        Ok(Self { samples })
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::checked(load_samples(path)?, &path.display().to_string())
    }

    pub fn load_energy_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::checked(load_energy_csv(path)?, &path.display().to_string())
    }

    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&PowerSample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&PowerSample> {
        self.samples.last()
    }

    /// Samples strictly after `after` and strictly before `before`.
    pub fn between(
        &self,
        after: &DateTime<FixedOffset>,
        before: &DateTime<FixedOffset>,
    ) -> &[PowerSample] {
        let start = self.samples.partition_point(|s| s.timestamp <= *after);
        let end = self.samples.partition_point(|s| s.timestamp < *before);
        if start >= end {
            &[]
        } else {
            &self.samples[start..end]
        }
    }

    /// Samples within `[from, to]`, both ends included.
    pub fn within(
        &self,
        from: &DateTime<FixedOffset>,
        to: &DateTime<FixedOffset>,
    ) -> &[PowerSample] {
        let start = self.samples.partition_point(|s| s.timestamp < *from);
        let end = self.samples.partition_point(|s| s.timestamp <= *to);
        if start >= end {
            &[]
        } else {
            &self.samples[start..end]
        }
    }
}

/// Writes the idle-trace CSV consumed by the baseline reports.
pub fn write_baseline_csv(path: impl AsRef<Path>, samples: &[PowerSample]) -> Result<()> {
    write_samples_csv(path.as_ref(), BASELINE_CSV_COLUMNS, samples)
}

/// Output columns of the wattmeter conversion for a given output file.
///
/// Files placed in an `energy` directory feed the energy computation, which expects the
/// value column to carry its unit.
pub fn wattmeter_columns(output: &Path) -> &'static [&'static str] {
    let in_energy_dir = output
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == crate::layout::ENERGY_DIR);
    if in_energy_dir {
        ENERGY_CSV_COLUMNS
    } else {
        WATTMETER_CSV_COLUMNS
    }
}

pub fn write_wattmeter_csv(path: impl AsRef<Path>, samples: &[PowerSample]) -> Result<()> {
    let path = path.as_ref();
    write_samples_csv(path, wattmeter_columns(path), samples)
}

fn write_samples_csv(path: &Path, columns: &[&str], samples: &[PowerSample]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(columns)?;
    for sample in samples {
        wtr.write_record(&[format_instant(&sample.timestamp), sample.value.to_string()])?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Reads the `timestamp`, `value (Watt)` table produced by the wattmeter conversion.
pub fn load_energy_csv(path: impl AsRef<Path>) -> Result<Vec<PowerSample>> {
    let path = path.as_ref();
    let what = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::schema(what.clone(), format!("missing column {name:?}")))
    };
    let ts_idx = column(ENERGY_CSV_COLUMNS[0])?;
    let value_idx = column(ENERGY_CSV_COLUMNS[1])?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let timestamp = parse_instant(&record[ts_idx])?;
        let value = record[value_idx]
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::parse(format!("{what} row {row}"), e))?;
        samples.push(PowerSample { timestamp, value });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn t(s: &str) -> DateTime<FixedOffset> {
        parse_instant(s).unwrap()
    }

    fn sample(ts: &str, value: f64) -> PowerSample {
        PowerSample {
            timestamp: t(ts),
            value,
        }
    }

    const JSON: &str = r#"[
        {"timestamp": "2024-06-01T10:00:00+02:00", "value": 100.0, "metric_id": "wattmetre_power_watt"},
        {"timestamp": "2024-06-01T10:00:01+02:00", "value": 3.5, "metric_id": "bmc_node_power_watt"},
        {"timestamp": "2024-06-01T10:00:02+02:00", "value": 110.5, "metric_id": "wattmetre_power_watt", "device_id": "node-1"}
    ]"#;

    #[test]
    fn test_load_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("READ_1G.json");
        fs::write(&path, JSON).unwrap();

        let samples = load_samples(&path).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1], sample("2024-06-01T10:00:01+02:00", 3.5));

        let samples = load_samples_with_metric(&path, POWER_METRIC_ID).unwrap();
        assert_eq!(
            samples,
            vec![
                sample("2024-06-01T10:00:00+02:00", 100.0),
                sample("2024-06-01T10:00:02+02:00", 110.5),
            ]
        );
    }

    #[test]
    fn test_load_samples_malformed() {
        let dir = tempfile::tempdir().unwrap();

        // Case 0: Not JSON
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"timestamp\": ").unwrap();
        assert!(matches!(load_samples(&path), Err(Error::Parse { .. })));

        // Case 1: Record without a value
        let path = dir.path().join("no_value.json");
        fs::write(&path, r#"[{"timestamp": "2024-06-01T10:00:00+02:00"}]"#).unwrap();
        assert!(matches!(load_samples(&path), Err(Error::Parse { .. })));

        // Case 2: Unparsable timestamp
        let path = dir.path().join("bad_ts.json");
        fs::write(&path, r#"[{"timestamp": "noon", "value": 1.0}]"#).unwrap();
        assert!(matches!(load_samples(&path), Err(Error::Parse { .. })));

        // Case 3: Missing file
        assert!(matches!(
            load_samples(dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_trace_rejects_unsorted() {
        let samples = vec![
            sample("2024-06-01T10:00:00+02:00", 1.0),
            sample("2024-06-01T10:00:02+02:00", 2.0),
            sample("2024-06-01T10:00:01+02:00", 3.0),
        ];
        assert!(matches!(
            PowerTrace::new(samples),
            Err(Error::Schema { .. })
        ));

        // Equal timestamps are fine
        let samples = vec![
            sample("2024-06-01T10:00:00+02:00", 1.0),
            sample("2024-06-01T10:00:00+02:00", 2.0),
        ];
        assert_eq!(PowerTrace::new(samples).unwrap().len(), 2);
    }

    #[test]
    fn test_between_is_exclusive() {
        let trace = PowerTrace::new(
            (0..6)
                .map(|i| sample(&format!("2024-06-01T10:00:0{i}+02:00"), i as f64))
                .collect(),
        )
        .unwrap();

        let values = |s: &[PowerSample]| s.iter().map(|s| s.value).collect::<Vec<_>>();
        assert_eq!(
            values(trace.between(
                &t("2024-06-01T10:00:01+02:00"),
                &t("2024-06-01T10:00:04+02:00")
            )),
            vec![2.0, 3.0]
        );
        assert_eq!(
            values(trace.within(
                &t("2024-06-01T10:00:01+02:00"),
                &t("2024-06-01T10:00:04+02:00")
            )),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert!(trace
            .between(
                &t("2024-06-01T10:00:04+02:00"),
                &t("2024-06-01T10:00:01+02:00")
            )
            .is_empty());
    }

    #[test]
    fn test_wattmeter_csv_columns() {
        let dir = tempfile::tempdir().unwrap();
        let energy_dir = dir.path().join("energy");
        fs::create_dir(&energy_dir).unwrap();
        let samples = vec![
            sample("2024-06-01T10:00:00+02:00", 100.0),
            sample("2024-06-01T10:00:01.5+02:00", 101.25),
        ];

        let plain = dir.path().join("read.csv");
        write_wattmeter_csv(&plain, &samples).unwrap();
        let content = fs::read_to_string(&plain).unwrap();
        assert!(content.starts_with("timestamp,value\n"));

        let energy = energy_dir.join("data.csv");
        write_wattmeter_csv(&energy, &samples).unwrap();
        let content = fs::read_to_string(&energy).unwrap();
        assert!(content.starts_with("timestamp,value (Watt)\n"));
        assert_eq!(load_energy_csv(&energy).unwrap(), samples);

        // The plain table lacks the unit column expected by the energy computation
        assert!(matches!(
            load_energy_csv(&plain),
            Err(Error::Schema { .. })
        ));
    }

    #[test]
    fn test_baseline_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.csv");
        write_baseline_csv(&path, &[sample("2024-06-01T10:00:00+02:00", 98.5)]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "timestamp (format: ISO8601),value (unit: watt)\n2024-06-01T10:00:00.000000+02:00,98.5\n"
        );
    }
}
