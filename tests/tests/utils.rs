use pat::prelude::*;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter("pat=debug,pat_runtime=debug,tower_http=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Runs `experiment` and returns every sample the tracker observed, in order.
#[allow(unused)]
pub async fn collect(experiment: &RunnableExperiment) -> Result<Vec<Sample>, ExperimentError> {
    let samples = Arc::new(Mutex::new(vec![]));
    let sink = samples.clone();
    experiment
        .run(|stream| async move {
            let collected = stream.collect().await;
            sink.lock().unwrap().extend(collected);
        })
        .await?;
    let samples = samples.lock().unwrap().clone();
    Ok(samples)
}

#[allow(unused)]
pub fn results(samples: &[Sample]) -> Vec<&Sample> {
    samples
        .iter()
        .filter(|s| s.sample_type == SampleType::Result)
        .collect()
}
