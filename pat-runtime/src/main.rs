use pat_runtime::{demo::demo_worker, PatRuntime};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "pat=info,pat_runtime=info,tower_http=debug";

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();

    if let Err(err) = PatRuntime::new(demo_worker()).with_args().run().await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
