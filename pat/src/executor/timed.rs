use super::ExecutorEvent;
use crate::workload::WorkloadInvoker;
use tokio::sync::mpsc::Sender;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// Instrumentation wrapper: reports the worker gauge around each invocation and publishes
/// the result.
#[derive(Debug)]
pub(crate) struct TimedWorker {
    invoker: WorkloadInvoker,
    events: Sender<ExecutorEvent>,
}

impl TimedWorker {
    pub fn new(invoker: WorkloadInvoker, events: Sender<ExecutorEvent>) -> Self {
        Self { invoker, events }
    }

    pub async fn run_once(&self) {
        self.publish(ExecutorEvent::Worker(1)).await;
        let result = self.invoker.invoke().await;
        self.publish(ExecutorEvent::Worker(-1)).await;
        self.publish(ExecutorEvent::Iteration(result)).await;
    }

    async fn publish(&self, event: ExecutorEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Sampler is gone; dropping executor event.");
        }
    }
}
