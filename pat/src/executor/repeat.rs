use super::cancel::Cancellation;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Repetition policy: run a cycle every `interval` until `stop` has elapsed.
///
/// A zero `stop` or a zero `interval` runs exactly one cycle. Cycles never overlap, and
/// cancellation is only checked between cycles. The loop returns as soon as the stop
/// deadline passes, even while waiting for the next tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RepeatEveryUntil {
    interval: Duration,
    stop: Duration,
}

impl RepeatEveryUntil {
    pub fn new(interval: Duration, stop: Duration) -> Self {
        Self { interval, stop }
    }

    /// Returns the number of cycles that were started.
    pub async fn run<F, Fut>(&self, cancel: &mut Cancellation, mut cycle: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.stop.is_zero() || self.interval.is_zero() {
            if cancel.is_cancelled() {
                info!("Cancelled before the first cycle.");
                return 0;
            }
            cycle().await;
            return 1;
        }

        let deadline = Instant::now() + self.stop;
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled after {cycles} cycles.");
                    break;
                }
                _ = sleep_until(deadline) => {
                    debug!("Stop deadline reached after {cycles} cycles.");
                    break;
                }
                _ = ticker.tick() => {}
            }

            trace!("Starting cycle {cycles}");
            cycle().await;
            cycles += 1;
        }

        cycles
    }
}
