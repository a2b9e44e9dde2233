use crate::ErrorInfo;
#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "rt")]
use serde_with::{serde_as, DurationNanoSeconds};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Which event produced a [`Sample`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub enum SampleType {
    /// An iteration finished (successfully or not).
    Result,
    /// A worker started or stopped.
    Worker,
    /// The sampler clock ticked and throughput was recomputed.
    Throughput,
    /// Reserved: errors are reported on `Result` samples.
    Error,
    #[default]
    Other,
}

impl SampleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleType::Result => "Result",
            SampleType::Worker => "Worker",
            SampleType::Throughput => "Throughput",
            SampleType::Error => "Error",
            SampleType::Other => "Other",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running statistics for every step sharing one command label.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "rt", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(
    feature = "rt",
    derive(Serialize, Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct Command {
    pub count: u64,
    /// Cumulative rate since the run started, refreshed on clock ticks only.
    pub throughput: f64,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub average: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub total_time: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub last_time: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub worst_time: Duration,
}

impl Command {
    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_time += duration;
        self.last_time = duration;
        self.average = mean(self.total_time, self.count);
        self.worst_time = self.worst_time.max(duration);
    }

    pub fn update_throughput(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs > 0. {
            self.throughput = self.count as f64 / secs;
        }
    }
}

/// Cumulative snapshot of a run, emitted once per event consumed by the sampler.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "rt", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(
    feature = "rt",
    derive(Serialize, Deserialize),
    serde(rename_all = "PascalCase")
)]
pub struct Sample {
    pub commands: BTreeMap<String, Command>,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub average: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub total_time: Duration,
    pub total: u64,
    pub total_errors: u64,
    pub total_workers: i64,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub last_result: Duration,
    pub last_error: Option<ErrorInfo>,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub worst_result: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub ninety_fifth_percentile: Duration,
    #[cfg_attr(feature = "rt", serde_as(as = "DurationNanoSeconds"))]
    pub wall_time: Duration,
    #[cfg_attr(feature = "rt", serde(rename = "Type"))]
    pub sample_type: SampleType,
}

impl Sample {
    /// Column layout of the tabular export.
    pub const CSV_HEADER: [&'static str; 10] = [
        "Average",
        "TotalTime",
        "Total",
        "TotalErrors",
        "TotalWorkers",
        "LastResult",
        "LastError",
        "WorstResult",
        "WallTime",
        "Type",
    ];

    /// One row of the tabular export, in [`Sample::CSV_HEADER`] order.
    pub fn csv_record(&self) -> [String; 10] {
        [
            format_duration(self.average),
            format_duration(self.total_time),
            self.total.to_string(),
            self.total_errors.to_string(),
            self.total_workers.to_string(),
            format_duration(self.last_result),
            self.last_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            format_duration(self.worst_result),
            format_duration(self.wall_time),
            self.sample_type.to_string(),
        ]
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] total={} errors={} workers={} avg={} p95={} worst={} wall={}",
            self.sample_type,
            self.total,
            self.total_errors,
            self.total_workers,
            format_duration(self.average),
            format_duration(self.ninety_fifth_percentile),
            format_duration(self.worst_result),
            format_duration(self.wall_time),
        )
    }
}

/// Integer mean of `total` over `count` samples, zero when empty.
pub fn mean(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / count as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
