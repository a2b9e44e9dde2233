//! Executor
//!
//! Drives the concurrency and repetition policy of an experiment. The executor is a
//! pipeline of three independent policies:
//!
//! - [`RepeatEveryUntil`] decides when cycles start and when the run is over,
//! - [`Concurrently`] runs one cycle as a batch of parallel workers,
//! - [`Counted`] hands out the cycle's iterations to whichever worker is free,
//!
//! wrapped around a [`TimedWorker`], which invokes the workload and reports worker-gauge
//! deltas and iteration results to the sampler.
//!
//! All reports flow through a single channel. Once [`Executor::execute`] returns, every
//! sender has been dropped and the channel is closed, which is the only completion signal the
//! sampler receives.
mod cancel;
mod concurrent;
mod repeat;
mod timed;

pub use cancel::CancelHandle;
pub(crate) use cancel::Cancellation;
pub(crate) use concurrent::{Concurrently, Counted};
pub(crate) use repeat::RepeatEveryUntil;
pub(crate) use timed::TimedWorker;

use crate::error::ConfigError;
use crate::workload::{WorkerCapability, WorkloadInvoker};
use pat_core::{IterationResult, RunConfig};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Event published by the executor to the sampler.
#[derive(Debug)]
pub(crate) enum ExecutorEvent {
    /// A signed change of the number of busy workers.
    Worker(i64),
    Iteration(IterationResult),
}

pub(crate) struct Executor {
    repetition: RepeatEveryUntil,
    parallelism: Concurrently,
    iterations: Counted,
    worker: TimedWorker,
    cancel: Cancellation,
}

impl Executor {
    /// Builds the pipeline, failing if the configuration cannot produce a worker pool.
    pub fn new(
        config: &RunConfig,
        capability: &dyn WorkerCapability,
        events: Sender<ExecutorEvent>,
        cancel: Cancellation,
    ) -> Result<Self, ConfigError> {
        let invoker = invoker(config, capability)?;

        Ok(Self {
            repetition: RepeatEveryUntil::new(config.interval(), config.stop()),
            parallelism: Concurrently::new(config.concurrency),
            iterations: Counted::new(config.iterations),
            worker: TimedWorker::new(invoker, events),
            cancel,
        })
    }

    /// Runs every cycle to completion (or until cancelled), then closes the event channel.
    #[instrument(name = "executor", skip_all)]
    pub async fn execute(self) -> usize {
        let Executor {
            repetition,
            parallelism,
            iterations,
            worker,
            mut cancel,
        } = self;

        let start = Instant::now();
        let worker = Arc::new(worker);
        let cycles = repetition
            .run(&mut cancel, || {
                let worker = worker.clone();
                async move {
                    debug!("Cycle started.");
                    let budget = iterations.budget();
                    parallelism
                        .run(|| {
                            let worker = worker.clone();
                            let budget = budget.clone();
                            async move { budget.run(|| worker.run_once()).await }
                        })
                        .await;
                    debug!("Cycle finished.");
                }
            })
            .await;

        // Last sender; dropping it closes the stream for the sampler.
        drop(worker);

        info!(
            "Executed {cycles} cycles in {}",
            humantime::format_duration(start.elapsed())
        );
        cycles
    }
}

/// Validates `config` and resolves the workload it names.
pub(crate) fn invoker(
    config: &RunConfig,
    capability: &dyn WorkerCapability,
) -> Result<WorkloadInvoker, ConfigError> {
    if config.concurrency == 0 {
        return Err(ConfigError::ZeroConcurrency);
    }
    if config.iterations == 0 {
        return Err(ConfigError::ZeroIterations);
    }

    let workload = capability
        .resolve(&config.workload)
        .ok_or_else(|| ConfigError::UnknownWorkload(config.workload.clone()))?;
    Ok(WorkloadInvoker::new(&config.workload, workload))
}
