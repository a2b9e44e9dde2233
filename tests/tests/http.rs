mod utils;
use utils::*;

use pat::prelude::*;
use pat_runtime::{router, CsvStore, Laboratory, ServerState};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

async fn serve(lab: Laboratory<CsvStore>) -> SocketAddr {
    let worker = Worker::new()
        .with_workload("push", || async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, WorkloadError>(())
        })
        .with_workload("broken", || async {
            Err::<(), _>(WorkloadError::from("target refused the push"))
        });

    let app = router(ServerState {
        lab,
        worker: Arc::new(worker),
        ui_dir: PathBuf::from("ui"),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn experiment_lifecycle_over_http() {
    init();

    let dir = tempfile::tempdir().unwrap();
    let lab = Laboratory::new(CsvStore::new(dir.path()).unwrap());
    let addr = serve(lab.clone()).await;
    let base = format!("http://{addr}");
    let client = Client::new();

    let res = client
        .post(format!("{base}/experiments/?iterations=6&concurrency=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["Location"], location);

    let guid = location.trim_start_matches("/experiments/").to_string();
    let record = lab.wait(&guid).await.unwrap();
    assert_eq!(record.config.iterations, 6);
    assert_eq!(record.config.concurrency, 2);

    let list: Value = client
        .get(format!("{base}/experiments/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["Items"][0]["Name"], format!("push ({guid})"));
    assert_eq!(list["Items"][0]["State"], "Finished");
    assert_eq!(list["Items"][0]["CsvLocation"], format!("{location}.csv"));

    let data: Value = client
        .get(format!("{base}{location}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = data["Items"].as_array().unwrap();
    let last = items.last().unwrap();
    assert_eq!(last["Total"], 6);
    assert_eq!(last["TotalWorkers"], 0);
    assert_eq!(
        items.iter().filter(|s| s["Type"] == "Result").count(),
        6
    );

    let csv = client
        .get(format!("{base}{location}.csv"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(csv.lines().count(), items.len() + 1);
    assert!(csv.starts_with(
        "Average,TotalTime,Total,TotalErrors,TotalWorkers,LastResult,LastError,WorstResult,WallTime,Type"
    ));

    // The store wrote the same rows to disk while the experiment ran.
    let on_disk = std::fs::read_to_string(dir.path().join(format!("{guid}.csv"))).unwrap();
    assert_eq!(on_disk, csv);
}

#[tokio::test]
async fn failing_workload_is_reported_in_samples() {
    init();

    let dir = tempfile::tempdir().unwrap();
    let lab = Laboratory::new(CsvStore::new(dir.path()).unwrap());
    let addr = serve(lab.clone()).await;
    let client = Client::new();

    let res = client
        .post(format!("http://{addr}/experiments/?workload=broken&iterations=3"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let location = body["Location"].as_str().unwrap().to_string();
    lab.wait(location.trim_start_matches("/experiments/"))
        .await
        .unwrap();

    let data: Value = client
        .get(format!("http://{addr}{location}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let last = data["Items"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["TotalErrors"], 3);
    assert_eq!(last["LastError"]["Message"], "target refused the push");
}

#[tokio::test]
async fn bad_requests() {
    init();

    let dir = tempfile::tempdir().unwrap();
    let addr = serve(Laboratory::new(CsvStore::new(dir.path()).unwrap())).await;
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let res = client
        .post(format!("http://{addr}/experiments/?workload=nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(format!("http://{addr}/experiments/?iterations=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(format!("http://{addr}/experiments/unknown.csv"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert!(res.status().is_redirection());
    assert_eq!(res.headers()["location"], "/ui");
}
