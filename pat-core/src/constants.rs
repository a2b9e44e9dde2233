use std::time::Duration;

/// Period of the sampler's clock. Every tick recomputes per-command throughput.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Percentile (in whole percent) tracked by the online percentile buffer.
pub const PERCENTILE: u64 = 95;

/// Capacity of the channels between executor, sampler and tracker.
///
/// Tokio has no rendezvous channel, so a single slot is the closest equivalent: a slow
/// consumer still back-pressures every producer.
pub const CHANNEL_CAPACITY: usize = 1;

/// Default workload identifier used by the front ends.
pub const DEFAULT_WORKLOAD: &str = "push";
