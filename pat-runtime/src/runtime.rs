//! Default pat runtime
//!
//! Either serves the HTTP API and web UI, or runs a single experiment from the command line
//! and prints its samples as they arrive.
use crate::{
    error::RuntimeError,
    laboratory::Laboratory,
    server::{server_task, ServerState},
    store::{CsvStore, Store},
};
use clap::Parser;
use pat::{
    ExperimentConfiguration, RunConfig, RunnableExperiment, Sample, WorkerCapability,
};
use pat_core::format_duration;
use std::path::PathBuf;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CSV_DIR: &str = "output/csvs";
const DEFAULT_UI_DIR: &str = "ui";

#[derive(Parser, Debug)]
#[command(version = "0.1", about = "Performance acceptance test runner")]
pub struct PatCli {
    /// Serve the HTTP API and web UI instead of running one experiment.
    #[arg(long)]
    server: bool,

    #[arg(short, long, env = "VCAP_APP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory the per-experiment CSVs are written to.
    #[arg(long, default_value = DEFAULT_CSV_DIR)]
    csv_dir: PathBuf,

    /// Iterations per cycle, shared by the workers.
    #[arg(short, long, default_value_t = 1)]
    iterations: usize,

    /// Concurrent workers per cycle.
    #[arg(short, long, default_value_t = 1)]
    concurrency: usize,

    /// Seconds between cycle starts, 0 runs a single cycle.
    #[arg(long, default_value_t = 0)]
    interval: u64,

    /// Seconds after which no new cycle starts, 0 runs a single cycle.
    #[arg(long, default_value_t = 0)]
    stop: u64,

    #[arg(short, long, default_value = pat_core::DEFAULT_WORKLOAD)]
    workload: String,
}

/// Default pat runtime.
///
/// # Example
///
/// ```ignore
/// use pat::prelude::*;
/// use pat_runtime::PatRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let worker = Worker::new().with_workload("noop", || async { Ok::<_, WorkloadError>(()) });
///     PatRuntime::new(worker)
///         .with_args()
///         .run()
///         .await
///         .unwrap();
/// }
/// ```
pub struct PatRuntime {
    worker: Arc<dyn WorkerCapability>,
    server: bool,
    port: u16,
    csv_dir: PathBuf,
    ui_dir: PathBuf,
    run_config: RunConfig,
}

impl PatRuntime {
    pub fn new<W: WorkerCapability + 'static>(worker: W) -> Self {
        PatRuntime {
            worker: Arc::new(worker),
            server: false,
            port: DEFAULT_PORT,
            csv_dir: PathBuf::from(DEFAULT_CSV_DIR),
            ui_dir: PathBuf::from(DEFAULT_UI_DIR),
            run_config: RunConfig::default(),
        }
    }

    /// Use the default CLI arguments for pat.
    ///
    /// `--server` to serve the HTTP API, `-p`, `--port` to pick its port (default `8080`, or
    /// `$VCAP_APP_PORT`), `--csv-dir` for the CSV output directory, and `--iterations`,
    /// `--concurrency`, `--interval`, `--stop`, `--workload` for the command line run.
    ///
    /// # Example
    /// ```ignore
    /// $ ./pat --iterations 10 --concurrency 5 --workload login
    /// $ ./pat --server -p 9090
    /// ```
    pub fn with_args(self) -> Self {
        self.with_cli(PatCli::parse())
    }

    pub fn with_cli(mut self, args: PatCli) -> Self {
        self.server = args.server;
        self.port = args.port;
        self.csv_dir = args.csv_dir;
        self.run_config = RunConfig::new(
            args.iterations,
            args.concurrency,
            args.interval,
            args.stop,
            &args.workload,
        );
        self
    }

    pub fn server(mut self, server: bool) -> Self {
        self.server = server;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn csv_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.csv_dir = dir.into();
        self
    }

    pub fn ui_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ui_dir = dir.into();
        self
    }

    pub fn run_config(mut self, config: RunConfig) -> Self {
        self.run_config = config;
        self
    }

    #[instrument(name = "pat", skip_all, fields(server = self.server))]
    pub async fn run(self) -> Result<(), RuntimeError> {
        let store = CsvStore::new(&self.csv_dir)?;
        if self.server {
            let state = ServerState {
                lab: Laboratory::new(store),
                worker: self.worker,
                ui_dir: self.ui_dir,
            };
            server_task(self.port, state).await?;
            Ok(())
        } else {
            run_once(self.run_config, self.worker, Arc::new(store)).await
        }
    }
}

/// Runs one experiment, printing every sample and recording it under a fresh guid.
async fn run_once<S: Store>(
    config: RunConfig,
    worker: Arc<dyn WorkerCapability>,
    store: Arc<S>,
) -> Result<(), RuntimeError> {
    let experiment =
        RunnableExperiment::new(ExperimentConfiguration::from_run_config(config, worker));
    experiment.config().validate().map_err(pat::ExperimentError::from)?;

    let guid = uuid::Uuid::new_v4().to_string();
    store.create(&guid)?;

    let cancel = experiment.cancel_handle();
    let ctrl_c = tokio::spawn(
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, waiting for the current cycle to finish.");
                cancel.cancel();
            }
        }
        .in_current_span(),
    );

    let tracker_store = store.clone();
    let tracker_guid = guid.clone();
    experiment
        .run(move |mut samples| async move {
            while let Some(sample) = samples.next().await {
                println!("{sample}");
                if let Err(err) = tracker_store.append(&tracker_guid, &sample) {
                    error!("Failed to record sample: {err}");
                }
            }
        })
        .await?;
    ctrl_c.abort();

    let samples = store.samples(&guid)?;
    println!("{}", summary(&guid, &samples));
    Ok(())
}

fn summary(guid: &str, samples: &[Sample]) -> String {
    let Some(last) = samples.last() else {
        return format!("Experiment {guid}: no samples recorded");
    };

    let mut out = format!(
        "Experiment {guid}: {} iterations, {} errors, average {}, 95th percentile {}, worst {}, wall time {}",
        last.total,
        last.total_errors,
        format_duration(last.average),
        format_duration(last.ninety_fifth_percentile),
        format_duration(last.worst_result),
        format_duration(last.wall_time),
    );
    for (name, command) in &last.commands {
        out.push_str(&format!(
            "\n  {name}: count={} average={} worst={} throughput={:.2}/s",
            command.count,
            format_duration(command.average),
            format_duration(command.worst_time),
            command.throughput,
        ));
    }
    if let Some(err) = &last.last_error {
        out.push_str(&format!("\n  last error: {err}"));
    }
    out
}
