//! Step recording
//!
//! Every iteration runs with its own [`StepRecorder`] installed as a task-local. Workloads
//! call [`step_hook`] (usually through the `#[step]` macro) to time a named sub-operation,
//! and the invoker collects the recorded steps into the iteration's result.
use pat_core::Step;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// Step hook used by the `#[step]` macro.
///
/// Times `func` and records it under `command` for the iteration currently running. Outside
/// of an iteration the future is simply awaited.
pub async fn step_hook<T, F>(command: &str, func: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let res = func.await;
    let elapsed = start.elapsed();

    #[cfg(feature = "metrics")]
    metrics::histogram!("pat_step_latency", "command" => command.to_string())
        .record(elapsed.as_secs_f64());

    if let Ok(recorder) = STEP_RECORDER.try_with(|v| v.clone()) {
        recorder.push(Step::new(command, elapsed));
    } else {
        warn!("No step recorder available for step \"{command}\".");
    }

    res
}

#[derive(Clone, Default)]
pub(crate) struct StepRecorder {
    steps: Arc<Mutex<Vec<Step>>>,
}

impl StepRecorder {
    fn push(&self, step: Step) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
    }

    pub(crate) fn take(&self) -> Vec<Step> {
        std::mem::take(&mut *self.steps.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

tokio::task_local! {
    pub(crate) static STEP_RECORDER: StepRecorder;
}
