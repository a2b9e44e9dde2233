use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, trace, warn, Instrument};

/// Parallelism policy: run `concurrency` copies of a worker and wait for all of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Concurrently {
    concurrency: usize,
}

impl Concurrently {
    pub fn new(concurrency: usize) -> Self {
        Self { concurrency }
    }

    pub async fn run<F, Fut>(&self, worker: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut join_set = JoinSet::new();
        for _ in 0..self.concurrency {
            join_set.spawn(worker().in_current_span());
        }

        while let Some(res) = join_set.join_next().await {
            if let Err(err) = res {
                error!("Worker task failed: {err}");
            }
        }
    }
}

/// Iteration policy: each cycle performs exactly `iterations` invocations, shared by all of
/// the cycle's workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Counted {
    iterations: usize,
}

impl Counted {
    pub fn new(iterations: usize) -> Self {
        Self { iterations }
    }

    /// A fresh budget for one cycle.
    pub fn budget(&self) -> Budget {
        Budget {
            remaining: Arc::new(AtomicUsize::new(self.iterations)),
        }
    }
}

/// Remaining iterations of one cycle. Workers keep claiming from it until it runs dry.
#[derive(Clone, Debug)]
pub(crate) struct Budget {
    remaining: Arc<AtomicUsize>,
}

impl Budget {
    fn claim(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Runs `action` back to back for as long as iterations can be claimed.
    pub async fn run<F, Fut>(&self, mut action: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        while self.claim() {
            action().await;
        }
    }
}
