use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// The sampler's clock. Counts whole periods since it was started.
pub(crate) struct Timer {
    interval: Interval,
    interval_dur: Duration,
    ticks: u32,
}

impl Timer {
    pub async fn new(interval_dur: Duration) -> Self {
        let mut interval = interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        interval.tick().await;
        Self {
            interval,
            interval_dur,
            ticks: 0,
        }
    }

    /// Waits for the next period and returns the clock time it marks.
    pub async fn tick(&mut self) -> Duration {
        self.interval.tick().await;
        self.ticks += 1;
        self.elapsed()
    }

    pub fn elapsed(&self) -> Duration {
        self.interval_dur * self.ticks
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}
