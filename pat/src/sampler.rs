//! Sampler
//!
//! A single aggregation task that merges executor events with its own clock and emits a
//! cumulative [`Sample`] after every event it consumes. It is the only owner of the running
//! statistics, so none of them are shared or locked.
mod percentile;
mod timer;

use crate::executor::ExecutorEvent;
use pat_core::{
    mean, Command, ErrorInfo, IterationResult, Sample, SampleType, PERCENTILE, TICK_INTERVAL,
};
use percentile::PercentileTracker;
use std::collections::BTreeMap;
use std::time::Duration;
use timer::Timer;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

pub(crate) struct Sampler {
    events: Receiver<ExecutorEvent>,
    samples: Sender<Sample>,
    stats: RunningStats,
}

impl Sampler {
    /// `max_iterations` is the expected number of iterations and sizes the percentile buffer.
    pub fn new(
        max_iterations: u64,
        events: Receiver<ExecutorEvent>,
        samples: Sender<Sample>,
    ) -> Self {
        Self {
            events,
            samples,
            stats: RunningStats::new(max_iterations),
        }
    }

    /// Runs until the executor's event stream closes, then closes the sample stream.
    #[instrument(name = "sampler", skip_all)]
    pub async fn sample(self) {
        let Sampler {
            mut events,
            samples,
            mut stats,
        } = self;

        let start = Instant::now();
        let mut timer = Timer::new(TICK_INTERVAL).await;
        debug!("Sampling every {timer}");
        let mut tracker_gone = false;

        loop {
            let sample_type = tokio::select! {
                event = events.recv() => match event {
                    Some(ExecutorEvent::Iteration(result)) => {
                        trace!("Iteration finished in {:?}", result.duration);
                        stats.record_iteration(result);
                        SampleType::Result
                    }
                    Some(ExecutorEvent::Worker(delta)) => {
                        trace!("Worker delta {delta}");
                        stats.record_worker(delta);
                        SampleType::Worker
                    }
                    None => break,
                },
                elapsed = timer.tick() => {
                    trace!("Tick at {elapsed:?}");
                    stats.record_tick(elapsed);
                    SampleType::Throughput
                }
            };

            if tracker_gone {
                continue;
            }

            let sample = stats.snapshot(sample_type, start.elapsed());
            if samples.send(sample).await.is_err() {
                warn!("Sample stream receiver dropped; continuing without emitting samples.");
                tracker_gone = true;
            }
        }

        debug!(
            "Event stream closed after {} iterations; closing sample stream.",
            stats.total
        );
    }
}

/// Cumulative run statistics, updated incrementally.
#[derive(Debug)]
pub(crate) struct RunningStats {
    commands: BTreeMap<String, Command>,
    total: u64,
    total_time: Duration,
    average: Duration,
    last_result: Duration,
    worst_result: Duration,
    total_errors: u64,
    last_error: Option<ErrorInfo>,
    workers: i64,
    percentile: PercentileTracker,
}

impl RunningStats {
    pub fn new(max_iterations: u64) -> Self {
        Self {
            commands: BTreeMap::new(),
            total: 0,
            total_time: Duration::ZERO,
            average: Duration::ZERO,
            last_result: Duration::ZERO,
            worst_result: Duration::ZERO,
            total_errors: 0,
            last_error: None,
            workers: 0,
            percentile: PercentileTracker::new(PERCENTILE, max_iterations),
        }
    }

    pub fn record_iteration(&mut self, result: IterationResult) {
        let IterationResult {
            duration,
            error,
            steps,
        } = result;

        self.total += 1;
        self.total_time += duration;
        self.average = mean(self.total_time, self.total);
        self.last_result = duration;
        self.worst_result = self.worst_result.max(duration);

        for step in steps {
            self.commands
                .entry(step.command)
                .or_default()
                .record(step.duration);
        }

        self.percentile.record(duration);

        if let Some(error) = error {
            self.total_errors += 1;
            self.last_error = Some(error);
        }
    }

    pub fn record_worker(&mut self, delta: i64) {
        self.workers += delta;
    }

    pub fn record_tick(&mut self, elapsed: Duration) {
        for command in self.commands.values_mut() {
            command.update_throughput(elapsed);
        }
    }

    pub fn snapshot(&self, sample_type: SampleType, wall_time: Duration) -> Sample {
        Sample {
            commands: self.commands.clone(),
            average: self.average,
            total_time: self.total_time,
            total: self.total,
            total_errors: self.total_errors,
            total_workers: self.workers,
            last_result: self.last_result,
            last_error: self.last_error.clone(),
            worst_result: self.worst_result,
            ninety_fifth_percentile: self.percentile.value(),
            wall_time,
            sample_type,
        }
    }
}
