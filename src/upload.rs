//! Pipeline orchestration entry points.
//!
//! [`UploadProcessor`] owns one [`Invocation`] and drives it through
//! staging → document → raster, strictly in order. Each stage's artifact is
//! flushed and closed before the next stage opens it. The first failure
//! stops the run; artifacts from earlier stages stay on disk.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::invocation::{Invocation, InvocationState, Stage};
use crate::output::{RequestOutcome, UploadResult};
use crate::pipeline::rasterize::{GhostscriptRasterizer, Rasterizer};
use crate::pipeline::{document, rasterize, stage};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Processes a single upload. Construct one per request.
pub struct UploadProcessor {
    config: PipelineConfig,
    rasterizer: Arc<dyn Rasterizer>,
    invocation: Invocation,
    state: InvocationState,
}

impl UploadProcessor {
    /// Create a processor with a fresh invocation identifier.
    pub fn new(config: PipelineConfig) -> Self {
        let invocation = Invocation::new(&config.staging_root, &config.source_path);
        Self::with_invocation(config, invocation)
    }

    /// Create a processor for a caller-built invocation.
    pub fn with_invocation(config: PipelineConfig, invocation: Invocation) -> Self {
        let rasterizer = resolve_rasterizer(&config);
        Self {
            config,
            rasterizer,
            invocation,
            state: InvocationState::Created,
        }
    }

    pub fn id(&self) -> Uuid {
        self.invocation.id()
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// Run staging, document conversion and rasterisation.
    ///
    /// # Errors
    /// Returns the first stage error unchanged. [`Self::state`] then reports
    /// `Failed(stage)`. Calling this twice returns [`PipelineError::AlreadyRun`].
    pub async fn process_upload(&mut self) -> Result<UploadResult, PipelineError> {
        if self.state != InvocationState::Created {
            return Err(PipelineError::AlreadyRun { id: self.id() });
        }

        let start = Instant::now();
        let id = self.id();
        info!("Processing upload {} from {}", id, self.config.source_path.display());
        if let Some(cb) = &self.config.progress_callback {
            cb.on_invocation_start(id);
        }

        // ── Stage 1: stage source ────────────────────────────────────────
        self.enter(Stage::Staging);
        let staged = stage::stage_source(
            &self.config.source_path,
            self.invocation.staged_path(),
            self.config.create_staging_root,
        )
        .await;
        let staged_path = self.leave(Stage::Staging, staged)?;

        // ── Stage 2: image → PDF ─────────────────────────────────────────
        self.enter(Stage::ToDocument);
        let converted = document::convert_to_document(
            &staged_path,
            self.invocation.document_path(),
            &self.config,
        )
        .await;
        let document_path = self.leave(Stage::ToDocument, converted)?;

        // ── Stage 3: PDF → TIFF ──────────────────────────────────────────
        self.enter(Stage::ToRaster);
        let rasterised = rasterize::convert_to_raster(
            self.rasterizer.as_ref(),
            &document_path,
            self.invocation.raster_path(),
            &self.config.raster,
        )
        .await;
        let output_raster_path = self.leave(Stage::ToRaster, rasterised)?;

        self.state = InvocationState::Completed;
        if let Some(cb) = &self.config.progress_callback {
            cb.on_invocation_complete(id, true);
        }
        info!(
            "Upload {} complete in {}ms",
            id,
            start.elapsed().as_millis()
        );

        Ok(UploadResult {
            staged_path,
            document_path,
            output_raster_path,
        })
    }

    fn enter(&mut self, stage: Stage) {
        self.state = InvocationState::Running(stage);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_stage_start(self.id(), stage);
        }
    }

    fn leave(
        &mut self,
        stage: Stage,
        result: Result<PathBuf, PipelineError>,
    ) -> Result<PathBuf, PipelineError> {
        let id = self.id();
        let cb: Option<&ProgressCallback> = self.config.progress_callback.as_ref();
        match result {
            Ok(path) => {
                if let Some(cb) = cb {
                    cb.on_stage_complete(id, stage, &path);
                }
                Ok(path)
            }
            Err(e) => {
                warn!("Upload {} failed while {}: {}", id, stage, e);
                if let Some(cb) = cb {
                    cb.on_stage_error(id, stage, &e.to_string());
                    cb.on_invocation_complete(id, false);
                }
                self.state = InvocationState::Failed(stage);
                Err(e)
            }
        }
    }
}

/// Run one invocation with a fresh processor.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use docstage::{process_upload, PipelineConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PipelineConfig::builder()
///         .staging_root("/tmp/docstage")
///         .source_path("image.tif")
///         .build()?;
///     let result = process_upload(&config).await?;
///     println!("{}", result.output_raster_path.display());
///     Ok(())
/// }
/// ```
pub async fn process_upload(config: &PipelineConfig) -> Result<UploadResult, PipelineError> {
    UploadProcessor::new(config.clone()).process_upload().await
}

/// Synchronous wrapper around [`process_upload`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_upload_sync(config: &PipelineConfig) -> Result<UploadResult, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_upload(config))
}

/// Serve `requests` simulated inbound requests, at most `concurrency` at a time.
///
/// Each request gets its own processor and identifier. Outcomes are returned
/// in request order.
pub async fn simulate_requests(
    config: &PipelineConfig,
    requests: usize,
    concurrency: usize,
) -> Vec<RequestOutcome> {
    let mut outcomes: Vec<RequestOutcome> = stream::iter((1..=requests).map(|request| {
        let mut processor = UploadProcessor::new(config.clone());
        async move {
            let result = processor.process_upload().await;
            RequestOutcome {
                request,
                id: processor.id(),
                result,
            }
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    outcomes.sort_by_key(|o| o.request);
    outcomes
}

/// Pick the rasterizer: an injected one, else Ghostscript at the configured path.
fn resolve_rasterizer(config: &PipelineConfig) -> Arc<dyn Rasterizer> {
    match &config.rasterizer {
        Some(r) => Arc::clone(r),
        None => Arc::new(GhostscriptRasterizer::new(&config.ghostscript_program)),
    }
}
