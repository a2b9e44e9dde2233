use crate::DEFAULT_WORKLOAD;
#[cfg(feature = "rt")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of a single experiment run.
///
/// `iterations` is the number of invocations in each cycle, drained by a pool of
/// `concurrency` workers. Cycles start every `interval_seconds` until `stop_seconds` have
/// elapsed; a `0` for either runs exactly one cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "rt", derive(Serialize, Deserialize))]
pub struct RunConfig {
    pub iterations: usize,
    pub concurrency: usize,
    pub interval_seconds: u64,
    pub stop_seconds: u64,
    pub workload: String,
}

impl RunConfig {
    pub fn new(
        iterations: usize,
        concurrency: usize,
        interval_seconds: u64,
        stop_seconds: u64,
        workload: &str,
    ) -> Self {
        Self {
            iterations,
            concurrency,
            interval_seconds,
            stop_seconds,
            workload: workload.to_string(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn stop(&self) -> Duration {
        Duration::from_secs(self.stop_seconds)
    }

    /// Number of iterations a single cycle performs across all workers. Used to size the
    /// percentile buffer.
    pub fn iterations_per_cycle(&self) -> usize {
        self.iterations
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(1, 1, 0, 0, DEFAULT_WORKLOAD)
    }
}
