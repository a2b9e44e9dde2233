mod utils;
use utils::*;

use metrics_exporter_prometheus::PrometheusBuilder;
use pat::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[pat::step("metrics_step")]
async fn timed(delay: Duration) {
    tokio::time::sleep(delay).await;
}

#[tokio::test(start_paused = true)]
async fn iterations_and_steps_are_exported() {
    init();
    let handle = PrometheusBuilder::new().install_recorder().unwrap();

    let rng = Arc::new(Mutex::new(SmallRng::seed_from_u64(7)));
    let calls = Arc::new(AtomicUsize::new(0));
    let worker = Worker::new().with_workload("metrics_mixed", move || {
        let delay = Duration::from_millis(rng.lock().unwrap().gen_range(10..100));
        let call = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            timed(delay).await;
            if call % 2 == 1 {
                return Err("odd call".into());
            }
            Ok::<_, WorkloadError>(())
        }
    });

    let experiment = RunnableExperiment::new(ExperimentConfiguration::new(
        6,
        3,
        0,
        0,
        Arc::new(worker),
        "metrics_mixed",
    ));
    let samples = collect(&experiment).await.unwrap();
    let last = samples.last().unwrap();
    assert_eq!(last.total_errors, 3);
    assert!(last.worst_result < Duration::from_millis(100));

    let rendered = handle.render();
    assert!(rendered.contains(r#"pat_iteration_success{workload="metrics_mixed"} 3"#));
    assert!(rendered.contains(r#"pat_iteration_error{workload="metrics_mixed"} 3"#));
    assert!(rendered.contains(r#"pat_step_latency_count{command="metrics_step"} 6"#));
}
