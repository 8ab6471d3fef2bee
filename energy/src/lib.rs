//! Post-processing of power-meter traces and I/O timing logs: interpolation of the power drawn
//! at I/O boundaries, per-operation perf tables and the log directory layout they live in.

mod atomic;
pub mod error;
pub mod event;
pub mod interpolate;
pub mod layout;
pub mod merge;
pub mod perf;
pub mod sample;
pub mod timestamp;

pub use error::{Error, Result};
pub use event::{IoEvent, SpanMode};
pub use interpolate::EnergyEstimate;
pub use layout::{AccessPattern, Condition, IoCategory, LogLayout};
pub use perf::{PerfRecord, PerfTable};
pub use sample::{PowerSample, PowerTrace};
