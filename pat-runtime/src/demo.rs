//! Demo workloads registered by the `pat` binary.
use pat::{Worker, WorkloadError};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Random (dummy) error")]
pub struct DummyError;

fn jitter(min_ms: u64, max_ms: u64) -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..max_ms))
}

/// Sleeps for a random 1 to 5 seconds.
pub async fn dummy() -> Result<(), WorkloadError> {
    tokio::time::sleep(jitter(1_000, 5_000)).await;
    Ok(())
}

/// Like [`dummy`], but fails roughly one time in ten.
pub async fn dummy_with_errors() -> Result<(), WorkloadError> {
    dummy().await?;
    if rand::thread_rng().gen_ratio(1, 10) {
        return Err(DummyError.into());
    }
    Ok(())
}

#[pat::step]
async fn login() -> Result<(), WorkloadError> {
    tokio::time::sleep(jitter(50, 150)).await;
    Ok(())
}

#[pat::step]
async fn push() -> Result<(), WorkloadError> {
    tokio::time::sleep(jitter(200, 600)).await;
    Ok(())
}

/// Registry with `dummy`, `dummywitherrors`, `login` and `push`.
pub fn demo_worker() -> Worker {
    Worker::new()
        .with_workload("dummy", dummy)
        .with_workload("dummywitherrors", dummy_with_errors)
        .with_workload("login", login)
        .with_workload("push", || async {
            login().await?;
            push().await
        })
}
