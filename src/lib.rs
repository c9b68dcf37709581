pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use services::pipeline::ReportPipeline;
use services::store::ReportStore;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<ReportStore>,
    pub pipeline: ReportPipeline,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<ReportStore>, pipeline: ReportPipeline) -> Self {
        Self {
            config,
            store,
            pipeline,
        }
    }
}
