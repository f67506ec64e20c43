//! # docstage
//!
//! Single-document ingestion pipeline: stage a source raster image, wrap it
//! in a one-page PDF, and rasterise that PDF to TIFF with Ghostscript.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source image
//!  │
//!  ├─ 1. Stage     copy to <root>/image-<id>.<ext>
//!  ├─ 2. Encode    decode + re-encode as JPEG in memory
//!  ├─ 3. Document  one fitted page → <root>/document-<id>.pdf
//!  └─ 4. Raster    gs -sDEVICE=tiff12nc … → <root>/raster-<id>.tiff
//! ```
//!
//! Every invocation gets a fresh UUID which is embedded in all three artifact
//! paths. Stages run strictly in order; the first failure is returned and
//! earlier artifacts are left in place.
//!
//! The staging root must exist before the first invocation. Create it during
//! deployment with [`provision_staging_root`], or opt in to creating it on
//! demand with [`PipelineConfigBuilder::create_staging_root`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstage::{process_upload, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .staging_root("/tmp/docstage")
//!         .source_path("image.tif")
//!         .build()?;
//!     let result = process_upload(&config).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docstage` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod invocation;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    PageSize, PipelineConfig, PipelineConfigBuilder, RasterDevice, RasterOptions, TiffCompression,
};
pub use error::PipelineError;
pub use invocation::{Invocation, InvocationState, Stage};
pub use output::{RequestOutcome, UploadResponse, UploadResult};
pub use pipeline::document::{inspect_document, DocumentSummary};
pub use pipeline::rasterize::{GhostscriptRasterizer, Rasterizer};
pub use pipeline::stage::provision_staging_root;
pub use progress::{NoopProgressCallback, ProgressCallback, StageProgressCallback};
pub use upload::{process_upload, process_upload_sync, simulate_requests, UploadProcessor};
