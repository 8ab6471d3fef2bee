use chrono::{DateTime, FixedOffset};

use crate::{
    error::{Error, Result},
    event::IoEvent,
    sample::{PowerSample, PowerTrace},
    timestamp::seconds_between,
};

/// Interpolated power at the boundaries of one I/O window, in watts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEstimate {
    pub begin: f64,
    pub end: f64,
    pub mean: f64,
}

impl EnergyEstimate {
    pub fn new(begin: f64, end: f64) -> Self {
        Self {
            begin,
            end,
            mean: (begin + end) / 2.0,
        }
    }
}

/// Evaluates the line through `a` and `b` at instant `t`.
///
/// Written in point-slope form around `a`, so that `t == a.timestamp` yields `a.value` exactly.
pub fn linear_at(a: &PowerSample, b: &PowerSample, t: &DateTime<FixedOffset>) -> f64 {
    let span = seconds_between(&a.timestamp, &b.timestamp);
    if span == 0.0 {
        return a.value;
    }
    let slope = (b.value - a.value) / span;
    a.value + slope * seconds_between(&a.timestamp, t)
}

impl PowerTrace {
    /// Returns the last sample at or before `t` and the first sample at or after `t`.
    pub fn bracket(&self, t: &DateTime<FixedOffset>) -> Result<(&PowerSample, &PowerSample)> {
        let samples = self.samples();
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Err(Error::EmptyTrace { instant: *t });
        };
        let out_of_range = || Error::OutOfRange {
            instant: *t,
            first: first.timestamp,
            last: last.timestamp,
        };

        let after_a = samples.partition_point(|s| s.timestamp <= *t);
        let b_idx = samples.partition_point(|s| s.timestamp < *t);
        if after_a == 0 || b_idx == samples.len() {
            return Err(out_of_range());
        }
        Ok((&samples[after_a - 1], &samples[b_idx]))
    }

    /// Instantaneous power at `t`, linearly interpolated between the bracketing samples.
    pub fn power_at(&self, t: &DateTime<FixedOffset>) -> Result<f64> {
        let (a, b) = self.bracket(t)?;
        Ok(linear_at(a, b, t))
    }

    /// Interpolates the power at both boundaries of `event`, independently.
    pub fn estimate(&self, event: &IoEvent) -> Result<EnergyEstimate> {
        Ok(EnergyEstimate::new(
            self.power_at(&event.begin)?,
            self.power_at(&event.end)?,
        ))
    }
}
