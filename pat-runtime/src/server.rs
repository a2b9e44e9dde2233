use crate::{
    error::{LabError, StoreError},
    export::render_csv,
    laboratory::{ExperimentState, Laboratory},
    store::Store,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use pat::{
    ConfigError, ExperimentConfiguration, ExperimentError, RunConfig, RunnableExperiment,
    WorkerCapability,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
#[allow(unused)]
use tracing::{debug, error, info, instrument};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Address Parsing Error")]
    AddrParseError(#[from] std::net::AddrParseError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

pub(crate) async fn server_task<S: Store>(
    port: u16,
    state: ServerState<S>,
) -> Result<(), ServerError> {
    let app = router(state);

    let socket_addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    info!("Listening on {socket_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

pub struct ServerState<S: Store> {
    pub lab: Laboratory<S>,
    pub worker: Arc<dyn WorkerCapability>,
    pub ui_dir: PathBuf,
}

pub fn router<S: Store>(state: ServerState<S>) -> Router {
    let ui = ServeDir::new(&state.ui_dir);
    Router::new()
        .route("/", get(redirect_base))
        .route("/experiments", get(list::<S>).post(start::<S>))
        .route("/experiments/", get(list::<S>).post(start::<S>))
        .route("/experiments/:name", get(experiment::<S>))
        .nest_service("/ui", ui)
        .with_state(Arc::new(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[derive(Error, Debug)]
enum HandlerError {
    #[error("Laboratory error: {0}")]
    Lab(#[from] LabError),

    #[error("Export error: {0}")]
    Export(#[from] StoreError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        use HandlerError::*;
        match self {
            Lab(LabError::Store(StoreError::NotFound(guid)))
            | Export(StoreError::NotFound(guid)) => {
                (StatusCode::NOT_FOUND, format!("Experiment {guid} not found"))
            }
            Lab(LabError::Experiment(ExperimentError::Config(
                err @ ConfigError::UnknownWorkload(_),
            ))) => (StatusCode::NOT_FOUND, err.to_string()),
            Lab(LabError::Experiment(ExperimentError::Config(err))) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            err => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {err}"),
            ),
        }
        .into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListResponse<T> {
    items: Vec<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExperimentSummary {
    name: String,
    location: String,
    csv_location: String,
    state: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Started {
    location: String,
    csv_location: String,
}

fn location(guid: &str) -> String {
    format!("/experiments/{guid}")
}

fn csv_location(guid: &str) -> String {
    format!("/experiments/{guid}.csv")
}

async fn redirect_base() -> Redirect {
    Redirect::to("/ui")
}

async fn list<S: Store>(
    State(state): State<Arc<ServerState<S>>>,
) -> Result<Json<ListResponse<ExperimentSummary>>, HandlerError> {
    let mut items = vec![];
    state.lab.visit(|record| {
        items.push(ExperimentSummary {
            name: format!("{} ({})", record.config.workload, record.guid),
            location: location(&record.guid),
            csv_location: csv_location(&record.guid),
            state: match &record.state {
                ExperimentState::Failed(_) => "Failed".to_string(),
                state => state.to_string(),
            },
        })
    })?;
    Ok(Json(ListResponse { items }))
}

/// Parses `key` from the query, falling back to `default` when absent or malformed.
fn param<T: FromStr>(params: &HashMap<String, String>, key: &str, default: T) -> T {
    params
        .get(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn run_config(params: &HashMap<String, String>) -> RunConfig {
    let defaults = RunConfig::default();
    let workload = params
        .get("workload")
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .unwrap_or(&defaults.workload);
    RunConfig::new(
        param(params, "iterations", defaults.iterations),
        param(params, "concurrency", defaults.concurrency),
        param(params, "interval", defaults.interval_seconds),
        param(params, "stop", defaults.stop_seconds),
        workload,
    )
}

#[instrument(skip_all)]
async fn start<S: Store>(
    State(state): State<Arc<ServerState<S>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, HandlerError> {
    let config = run_config(&params);
    debug!("Starting experiment with {config:?}");
    let experiment = RunnableExperiment::new(ExperimentConfiguration::from_run_config(
        config,
        state.worker.clone(),
    ));
    let guid = state.lab.run(experiment)?;

    let body = Started {
        location: location(&guid),
        csv_location: csv_location(&guid),
    };
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, body.location.clone())],
        Json(body),
    )
        .into_response())
}

async fn experiment<S: Store>(
    State(state): State<Arc<ServerState<S>>>,
    Path(name): Path<String>,
) -> Result<Response, HandlerError> {
    if let Some(guid) = name.strip_suffix(".csv") {
        let samples = state.lab.data(guid)?;
        let csv = render_csv(&samples)?;
        return Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response());
    }

    let samples = state.lab.data(&name)?;
    Ok(Json(ListResponse { items: samples }).into_response())
}
