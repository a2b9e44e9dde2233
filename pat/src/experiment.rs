//! Experiment configuration and orchestration
use crate::error::{ConfigError, ExperimentError};
use crate::executor::{self, CancelHandle, Executor};
use crate::sampler::Sampler;
use crate::workload::WorkerCapability;
use pat_core::{RunConfig, Sample, CHANNEL_CAPACITY};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Immutable configuration of one experiment: the run parameters plus the capability that
/// resolves the workload they name.
#[derive(Clone)]
pub struct ExperimentConfiguration {
    pub run: RunConfig,
    pub worker: Arc<dyn WorkerCapability>,
}

impl ExperimentConfiguration {
    pub fn new(
        iterations: usize,
        concurrency: usize,
        interval_seconds: u64,
        stop_seconds: u64,
        worker: Arc<dyn WorkerCapability>,
        workload: &str,
    ) -> Self {
        Self::from_run_config(
            RunConfig::new(
                iterations,
                concurrency,
                interval_seconds,
                stop_seconds,
                workload,
            ),
            worker,
        )
    }

    pub fn from_run_config(run: RunConfig, worker: Arc<dyn WorkerCapability>) -> Self {
        Self { run, worker }
    }

    /// Checks that a worker pool can be built from this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        executor::invoker(&self.run, self.worker.as_ref()).map(|_| ())
    }
}

impl fmt::Debug for ExperimentConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentConfiguration")
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

/// The live, forward-only stream of samples handed to a tracker.
///
/// Samples arrive in emission order. The stream ends after the last sample once the run is
/// over.
#[derive(Debug)]
pub struct SampleStream {
    rx: Receiver<Sample>,
}

impl SampleStream {
    pub async fn next(&mut self) -> Option<Sample> {
        self.rx.recv().await
    }

    /// Drains the stream to completion.
    pub async fn collect(mut self) -> Vec<Sample> {
        let mut samples = vec![];
        while let Some(sample) = self.next().await {
            samples.push(sample);
        }
        samples
    }
}

/// An experiment that can be run.
///
/// # Example
/// ```no_run
/// use pat::prelude::*;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let worker = Worker::new().with_workload("noop", || async { Ok::<_, WorkloadError>(()) });
///     let config = ExperimentConfiguration::new(10, 2, 0, 0, Arc::new(worker), "noop");
///
///     RunnableExperiment::new(config)
///         .run(|mut samples| async move {
///             while let Some(sample) = samples.next().await {
///                 println!("{sample}");
///             }
///         })
///         .await
///         .unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct RunnableExperiment {
    config: ExperimentConfiguration,
    cancel: CancelHandle,
}

impl RunnableExperiment {
    pub fn new(config: ExperimentConfiguration) -> Self {
        Self {
            config,
            cancel: CancelHandle::new(),
        }
    }

    pub fn config(&self) -> &ExperimentConfiguration {
        &self.config
    }

    /// Handle that stops new cycles from starting once triggered.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs the experiment, handing the live sample stream to `tracker`.
    ///
    /// The sampler and the tracker are started first, then the executor runs to completion
    /// on the calling task. Returns once the tracker has drained the stream. Only an invalid
    /// configuration is reported as an error, and in that case nothing is started; workload
    /// failures show up in the samples.
    #[instrument(name = "experiment", skip_all, fields(workload = %self.config.run.workload))]
    pub async fn run<T, F>(&self, tracker: T) -> Result<(), ExperimentError>
    where
        T: FnOnce(SampleStream) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        let RunConfig {
            iterations,
            concurrency,
            interval_seconds,
            stop_seconds,
            ..
        } = self.config.run;
        info!(
            "Running with iterations={iterations} concurrency={concurrency} interval={interval_seconds}s stop={stop_seconds}s"
        );

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (sample_tx, sample_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let executor = Executor::new(
            &self.config.run,
            self.config.worker.as_ref(),
            event_tx,
            self.cancel.subscribe(),
        )?;

        let start = Instant::now();
        let max_iterations = self.config.run.iterations_per_cycle() as u64;
        let sampler = tokio::spawn(
            Sampler::new(max_iterations, event_rx, sample_tx)
                .sample()
                .in_current_span(),
        );
        let tracker = tokio::spawn(tracker(SampleStream { rx: sample_rx }).in_current_span());

        executor.execute().await;

        sampler.await.map_err(|err| {
            error!("Sampler task failed: {err}");
            ExperimentError::SamplerPanicked
        })?;
        tracker.await.map_err(|err| {
            error!("Tracker task failed: {err}");
            ExperimentError::TrackerPanicked
        })?;

        info!(
            "Experiment complete in {}",
            humantime::format_duration(start.elapsed())
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{Worker, WorkloadError};
    use pat_core::SampleType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn sleeping_worker(ms: u64) -> Arc<dyn WorkerCapability> {
        Arc::new(Worker::new().with_workload("sleep", move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, WorkloadError>(())
        }))
    }

    async fn collect(experiment: &RunnableExperiment) -> Vec<Sample> {
        let collected = Arc::new(Mutex::new(vec![]));
        let sink = collected.clone();
        experiment
            .run(|stream| async move {
                let samples = stream.collect().await;
                sink.lock().unwrap().extend(samples);
            })
            .await
            .unwrap();
        let samples = collected.lock().unwrap().clone();
        samples
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_configuration_starts_nothing() {
        let started = Arc::new(AtomicUsize::new(0));
        let flag = started.clone();
        let experiment = RunnableExperiment::new(ExperimentConfiguration::new(
            1,
            1,
            0,
            0,
            sleeping_worker(1),
            "missing",
        ));

        let err = experiment
            .run(|_| {
                flag.fetch_add(1, Ordering::SeqCst);
                async {}
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExperimentError::Config(ConfigError::UnknownWorkload(_))
        ));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn total_is_monotonic_and_counts_result_samples() {
        let experiment = RunnableExperiment::new(ExperimentConfiguration::new(
            20,
            4,
            0,
            0,
            sleeping_worker(700),
            "sleep",
        ));

        let samples = collect(&experiment).await;

        let mut results = 0;
        let mut previous = 0;
        for sample in &samples {
            if sample.sample_type == SampleType::Result {
                results += 1;
            }
            assert!(sample.total >= previous);
            assert_eq!(sample.total, results);
            previous = sample.total;
        }
        assert_eq!(previous, 20);
        assert_eq!(samples.last().unwrap().total_workers, 0);
        assert!(samples
            .iter()
            .any(|s| s.sample_type == SampleType::Throughput));
    }

    #[tokio::test(start_paused = true)]
    async fn validate_reports_config_errors() {
        let config = ExperimentConfiguration::new(1, 0, 0, 0, sleeping_worker(1), "sleep");
        assert_eq!(config.validate(), Err(ConfigError::ZeroConcurrency));

        let config = ExperimentConfiguration::new(1, 1, 0, 0, sleeping_worker(1), "sleep");
        assert_eq!(config.validate(), Ok(()));
    }
}
