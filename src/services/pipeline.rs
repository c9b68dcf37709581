use bytes::Bytes;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::UploadOutcome;
use crate::services::loader;
use crate::services::profiler::ProfilingEngine;
use crate::services::store::ReportStore;

/// One file received from the upload form. `filename` may be empty when
/// the user submitted without choosing a file.
pub struct ReceivedUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Drives one upload/profile cycle:
/// validate -> clear store -> persist upload -> load table -> profile ->
/// persist report. Each failure exit is terminal for the request; there is
/// no retry logic.
pub struct ReportPipeline {
    store: Arc<ReportStore>,
    engine: Arc<dyn ProfilingEngine>,
}

impl ReportPipeline {
    pub fn new(store: Arc<ReportStore>, engine: Arc<dyn ProfilingEngine>) -> Self {
        Self { store, engine }
    }

    /// Runs a full cycle under the store guard, so at most one cycle
    /// executes process-wide at a time, and maps the result into the typed
    /// outcome the web layer renders.
    pub async fn run(&self, upload: Option<ReceivedUpload>) -> UploadOutcome {
        let _cycle = self.store.lock().await;
        let start = std::time::Instant::now();

        let result = self.execute(upload);
        match &result {
            Ok(()) => {
                tracing::info!("upload cycle completed in {:?}", start.elapsed());
            }
            Err(PipelineError::Storage(e)) => {
                tracing::error!("upload cycle aborted on storage failure: {}", e);
            }
            Err(e) => {
                tracing::warn!("upload cycle rejected: {}", e);
            }
        }

        UploadOutcome::from_result(&result)
    }

    fn execute(&self, upload: Option<ReceivedUpload>) -> Result<(), PipelineError> {
        let upload = upload
            .filter(|u| !u.filename.trim().is_empty())
            .ok_or(PipelineError::NoFile)?;

        if !loader::is_allowed_extension(&upload.filename) {
            return Err(PipelineError::RejectedFormat(upload.filename));
        }

        // Destructive on purpose: the previous source file and report are
        // gone even if the new upload later fails to load.
        self.store.clear()?;
        let path = self.store.save_upload(&upload.filename, &upload.bytes)?;
        tracing::info!("stored upload at {}", path.display());

        let load_start = std::time::Instant::now();
        let table = loader::load_table(&path)?;
        tracing::info!(
            "loaded {} rows x {} columns in {:?}",
            table.height(),
            table.width(),
            load_start.elapsed()
        );

        let artifact = self.engine.generate(&upload.filename, &table)?;
        let report_path = self.store.save_report(&artifact.html)?;
        tracing::info!("report written to {}", report_path.display());

        Ok(())
    }
}
