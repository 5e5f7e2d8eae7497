use std::sync::Arc;

use answer_pipeline::OpenAiGenerator;
use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::{
    storage::store::DocumentStore,
    utils::config::{get_config, AppConfig},
};
use ingestion_pipeline::{run_artifact_worker, ArtifactWorker, IngestionPipeline};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    // One store for the whole process; fail fast if it cannot be opened
    let store = Arc::new(DocumentStore::new(config.clone()));
    store.ensure_ready().await?;

    let app = build_app(&config, store);

    let serve_address = format!("0.0.0.0:{}", config.http_port);
    info!("Starting server listening on {serve_address}");
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the pipelines around `store`, starts the artifact worker and returns
/// the HTTP application.
fn build_app(config: &AppConfig, store: Arc<DocumentStore>) -> Router {
    let (pipeline, jobs) = IngestionPipeline::new(Arc::clone(&store));
    let worker = ArtifactWorker::new(store, config);
    tokio::spawn(run_artifact_worker(worker, jobs));

    let generator = Arc::new(OpenAiGenerator::from_config(config));
    let api_state = ApiState::new(config, Arc::new(pipeline), generator);

    Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(AppState { api_state })
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
