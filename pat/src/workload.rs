//! Workloads and the registry that resolves them by name.
use crate::step::{StepRecorder, STEP_RECORDER};
use pat_core::{ErrorInfo, ErrorKind, IterationResult};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// Error type a workload may fail with.
pub type WorkloadError = Box<dyn std::error::Error + Send + Sync>;

pub type BoxedFut = Pin<Box<dyn Future<Output = Result<(), WorkloadError>> + Send>>;

/// A type-erased, zero-argument async action.
#[derive(Clone)]
pub struct Workload(Arc<dyn Fn() -> BoxedFut + Send + Sync>);

impl Workload {
    pub fn new<T, F, E>(func: T) -> Self
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<WorkloadError>,
    {
        Self(Arc::new(move || {
            let fut = func();
            Box::pin(async move { fut.await.map_err(Into::into) })
        }))
    }

    pub fn call(&self) -> BoxedFut {
        (self.0)()
    }
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Workload")
    }
}

/// Resolves workload identifiers to runnable workloads.
pub trait WorkerCapability: Send + Sync {
    fn resolve(&self, workload: &str) -> Option<Workload>;

    /// Identifiers this capability knows about, if it can enumerate them.
    fn workloads(&self) -> Vec<String> {
        vec![]
    }
}

/// In-process registry of named workloads.
///
/// # Example
/// ```no_run
/// use pat::prelude::*;
///
/// let worker = Worker::new()
///     .with_workload("noop", || async { Ok::<_, std::io::Error>(()) });
/// assert!(worker.resolve("noop").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Worker {
    workloads: HashMap<String, Workload>,
}

impl Worker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workload<T, F, E>(&mut self, name: &str, func: T) -> &mut Self
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<WorkloadError>,
    {
        self.workloads.insert(name.to_string(), Workload::new(func));
        self
    }

    pub fn with_workload<T, F, E>(mut self, name: &str, func: T) -> Self
    where
        T: Fn() -> F + Send + Sync + 'static,
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<WorkloadError>,
    {
        self.add_workload(name, func);
        self
    }
}

impl WorkerCapability for Worker {
    fn resolve(&self, workload: &str) -> Option<Workload> {
        self.workloads.get(workload).cloned()
    }

    fn workloads(&self) -> Vec<String> {
        let mut names: Vec<_> = self.workloads.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("workloads", &self.workloads())
            .finish()
    }
}

/// Runs one workload exactly once and reports what happened.
#[derive(Clone, Debug)]
pub struct WorkloadInvoker {
    name: String,
    workload: Workload,
}

impl WorkloadInvoker {
    pub fn new(name: &str, workload: Workload) -> Self {
        Self {
            name: name.to_string(),
            workload,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the workload once, timing it and collecting the steps it records.
    ///
    /// The workload runs in its own task so that a panic is reported as an error of this
    /// iteration instead of taking the worker down.
    pub async fn invoke(&self) -> IterationResult {
        let recorder = StepRecorder::default();

        let start = Instant::now();
        let handle = tokio::spawn(STEP_RECORDER.scope(recorder.clone(), self.workload.call()));
        let res = handle.await;
        let duration = start.elapsed();

        let error = match res {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                debug!("Workload {} failed: {err}", self.name);
                Some(ErrorInfo::workload(err.to_string()))
            }
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                error!("Workload {} panicked: {message}", self.name);
                Some(ErrorInfo::panic(message))
            }
            Err(err) => Some(ErrorInfo::new(ErrorKind::Aborted, err.to_string())),
        };

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!("pat_iteration_latency", "workload" => self.name.clone())
                .record(duration.as_secs_f64());
            if error.is_some() {
                metrics::counter!("pat_iteration_error", "workload" => self.name.clone())
                    .increment(1);
            } else {
                metrics::counter!("pat_iteration_success", "workload" => self.name.clone())
                    .increment(1);
            }
        }

        IterationResult {
            duration,
            error,
            steps: recorder.take(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
