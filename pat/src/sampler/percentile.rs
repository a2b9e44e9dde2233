use std::time::Duration;

/// Online, bounded-memory approximation of a high percentile.
///
/// Retains only the largest `window(max_iterations)` durations in an ascending buffer and
/// reads the percentile from a position derived from how many values have been seen so
/// far. The estimate is exact while the number of values seen matches `max_iterations`,
/// and degrades towards the smallest retained value once more values arrive than the buffer
/// was sized for; the read position is clamped so it never leaves the buffer.
#[derive(Clone, Debug)]
pub(crate) struct PercentileTracker {
    percentile: u64,
    buffer: Vec<Duration>,
    seen: u64,
    value: Duration,
}

impl PercentileTracker {
    /// `percentile` is expressed in whole percent, e.g. `95`.
    pub fn new(percentile: u64, max_iterations: u64) -> Self {
        let percentile = percentile.min(100);
        let len = window(percentile, max_iterations);
        Self {
            percentile,
            buffer: vec![Duration::ZERO; len],
            seen: 0,
            value: Duration::ZERO,
        }
    }

    pub fn record(&mut self, value: Duration) -> Duration {
        self.seen += 1;

        if value > self.buffer[0] {
            self.buffer[0] = value;
            let mut i = 0;
            while i + 1 < self.buffer.len() && value > self.buffer[i + 1] {
                self.buffer.swap(i, i + 1);
                i += 1;
            }
        }

        let index = self
            .buffer
            .len()
            .saturating_sub(window(self.percentile, self.seen))
            .min(self.buffer.len() - 1);
        self.value = self.buffer[index];
        self.value
    }

    pub fn value(&self) -> Duration {
        self.value
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// `ceil(n * (1 - p) + p)` for `p = percentile / 100`, computed without floating point.
///
/// For the 95th percentile this is `ceil(n * 0.05 + 0.95)`: the number of values at or
/// above the percentile among `n`, and never less than one.
fn window(percentile: u64, n: u64) -> usize {
    let tail = 100 - percentile;
    let slots = (n.saturating_mul(tail) + percentile + 99) / 100;
    usize::try_from(slots.max(1)).unwrap_or(usize::MAX)
}
