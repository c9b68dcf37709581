use anyhow::Result;
use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use tabular_profiler::services::pipeline::ReportPipeline;
use tabular_profiler::services::profiler::DataFrameProfiler;
use tabular_profiler::services::store::ReportStore;
use tabular_profiler::{config, logging, routes, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;

    // Single-slot storage plus the engine behind the capability trait
    let store = Arc::new(ReportStore::new(&config.upload_dir)?);
    let pipeline = ReportPipeline::new(Arc::clone(&store), Arc::new(DataFrameProfiler));

    let max_upload_bytes = config.max_upload_bytes;
    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, store, pipeline));

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Run it
    tracing::info!("listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
