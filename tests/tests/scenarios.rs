mod utils;
use utils::*;

use pat::prelude::*;
use pat::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn experiment(
    iterations: usize,
    concurrency: usize,
    interval: u64,
    stop: u64,
    worker: Worker,
    workload: &str,
) -> RunnableExperiment {
    RunnableExperiment::new(ExperimentConfiguration::new(
        iterations,
        concurrency,
        interval,
        stop,
        Arc::new(worker),
        workload,
    ))
}

/// Records when each invocation started, relative to `start`.
fn stamping_worker(start: Instant, stamps: Arc<Mutex<Vec<Duration>>>) -> Worker {
    Worker::new().with_workload("stamp", move || {
        stamps.lock().unwrap().push(start.elapsed());
        async { Ok::<_, WorkloadError>(()) }
    })
}

#[tokio::test(start_paused = true)]
async fn single_successful_iteration() {
    init();

    let worker = Worker::new().with_workload("sleep", || async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<_, WorkloadError>(())
    });
    let samples = collect(&experiment(1, 1, 0, 0, worker, "sleep"))
        .await
        .unwrap();

    let results = results(&samples);
    assert_eq!(results.len(), 1);
    let result = results[0];
    assert_eq!(result.total, 1);
    assert_eq!(result.average, Duration::from_millis(100));
    assert_eq!(result.total_errors, 0);
    assert!(result.last_error.is_none());

    let last = samples.last().unwrap();
    assert_eq!(last.total_workers, 0);
    assert_eq!(last.sample_type, SampleType::Result);
}

#[tokio::test(start_paused = true)]
async fn failed_iterations_are_counted() {
    init();

    let calls = Arc::new(AtomicUsize::new(0));
    let worker = Worker::new().with_workload("flaky", move || {
        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if call == 3 || call == 7 {
                return Err(format!("iteration {call} failed").into());
            }
            Ok::<_, WorkloadError>(())
        }
    });
    let samples = collect(&experiment(10, 2, 0, 0, worker, "flaky"))
        .await
        .unwrap();

    let mut previous = 0;
    for sample in &samples {
        assert!(sample.total >= previous);
        previous = sample.total;
    }
    assert_eq!(results(&samples).len(), 10);

    let last = samples.last().unwrap();
    assert_eq!(last.total, 10);
    assert_eq!(last.total_errors, 2);
    let error = last.last_error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::Workload);
    assert!(error.message.starts_with("iteration "));
}

#[pat::step]
async fn login() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[pat::step]
async fn push() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test(start_paused = true)]
async fn steps_are_aggregated_per_command() {
    init();

    let worker = Worker::new().with_workload("push", || async {
        login().await;
        push().await;
        Ok::<_, WorkloadError>(())
    });
    let samples = collect(&experiment(5, 1, 0, 0, worker, "push"))
        .await
        .unwrap();

    let last = samples.last().unwrap();
    assert_eq!(last.total, 5);
    assert_eq!(last.commands["push"].average, Duration::from_millis(200));
    assert_eq!(last.commands["push"].count, 5);
    assert_eq!(last.commands["login"].count, 5);
    assert_eq!(last.commands["login"].worst_time, Duration::from_millis(50));
    assert_eq!(last.average, Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn cycles_repeat_until_stop() {
    init();

    let start = Instant::now();
    let stamps = Arc::new(Mutex::new(vec![]));
    let worker = stamping_worker(start, stamps.clone());

    let samples = collect(&experiment(1, 1, 1, 3, worker, "stamp"))
        .await
        .unwrap();

    assert_eq!(
        *stamps.lock().unwrap(),
        vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(2)
        ]
    );
    assert_eq!(samples.last().unwrap().total, 3);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_runs_a_single_cycle() {
    init();

    let start = Instant::now();
    let stamps = Arc::new(Mutex::new(vec![]));
    let worker = stamping_worker(start, stamps.clone());

    let samples = collect(&experiment(1, 1, 0, 60, worker, "stamp"))
        .await
        .unwrap();

    assert_eq!(*stamps.lock().unwrap(), vec![Duration::ZERO]);
    assert_eq!(samples.last().unwrap().total, 1);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn stream_closes_at_stop_deadline_between_ticks() {
    init();

    let start = Instant::now();
    let stamps = Arc::new(Mutex::new(vec![]));
    let worker = stamping_worker(start, stamps.clone());

    let samples = collect(&experiment(1, 1, 10, 3, worker, "stamp"))
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(3));
    assert_eq!(*stamps.lock().unwrap(), vec![Duration::ZERO]);
    assert_eq!(samples.last().unwrap().total, 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_new_cycles() {
    init();

    let start = Instant::now();
    let stamps = Arc::new(Mutex::new(vec![]));
    let worker = stamping_worker(start, stamps.clone());
    let experiment = experiment(1, 1, 1, 3600, worker, "stamp");

    let cancel = experiment.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();
    });

    let samples = collect(&experiment).await.unwrap();

    assert!(experiment.cancel_handle().is_cancelled());
    assert_eq!(stamps.lock().unwrap().len(), 3);
    assert_eq!(samples.last().unwrap().total, 3);
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn panicking_workload_is_an_error_sample() {
    init();

    let calls = Arc::new(AtomicUsize::new(0));
    let worker = Worker::new().with_workload("panics", move || {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if call == 0 {
                panic!("first call blows up");
            }
            Ok::<_, WorkloadError>(())
        }
    });
    let samples = collect(&experiment(4, 1, 0, 0, worker, "panics"))
        .await
        .unwrap();

    let last = samples.last().unwrap();
    assert_eq!(last.total, 4);
    assert_eq!(last.total_errors, 1);
    assert_eq!(last.last_error.as_ref().unwrap().kind, ErrorKind::Panic);
}

#[tokio::test(start_paused = true)]
async fn throughput_samples_follow_the_clock() {
    init();

    let worker = Worker::new().with_workload("sleep", || async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, WorkloadError>(())
    });
    let samples = collect(&experiment(8, 2, 0, 0, worker, "sleep"))
        .await
        .unwrap();

    let ticks: Vec<_> = samples
        .iter()
        .filter(|s| s.sample_type == SampleType::Throughput)
        .collect();
    assert!(!ticks.is_empty());
    for sample in &samples {
        assert!(sample.total_workers >= 0 && sample.total_workers <= 2);
    }
    assert_eq!(samples.last().unwrap().total, 8);
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_is_rejected() {
    init();

    let worker = Worker::new().with_workload("noop", || async { Ok::<_, WorkloadError>(()) });
    let err = collect(&experiment(1, 0, 0, 0, worker.clone(), "noop"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Config(ConfigError::ZeroConcurrency)
    ));

    let err = collect(&experiment(1, 1, 0, 0, worker, "nope"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Config(ConfigError::UnknownWorkload(name)) if name == "nope"
    ));
}
