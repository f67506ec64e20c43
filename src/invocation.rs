//! Per-invocation identity and artifact paths.
//!
//! Every path an invocation writes embeds its UUID, so two invocations
//! against the same staging root can never collide, even when they run
//! concurrently.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extension used for the staged copy when the source has none.
const FALLBACK_EXTENSION: &str = "img";

/// One pipeline run: a fresh identifier and the three paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    id: Uuid,
    staged_path: PathBuf,
    document_path: PathBuf,
    raster_path: PathBuf,
}

impl Invocation {
    /// Create an invocation with a freshly generated identifier.
    pub fn new(staging_root: &Path, source: &Path) -> Self {
        Self::with_id(Uuid::new_v4(), staging_root, source)
    }

    /// Create an invocation with a caller-chosen identifier.
    pub fn with_id(id: Uuid, staging_root: &Path, source: &Path) -> Self {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(FALLBACK_EXTENSION);

        Self {
            id,
            staged_path: staging_root.join(format!("image-{id}.{ext}")),
            document_path: staging_root.join(format!("document-{id}.pdf")),
            raster_path: staging_root.join(format!("raster-{id}.tiff")),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `<root>/image-<id>.<ext>`
    pub fn staged_path(&self) -> &Path {
        &self.staged_path
    }

    /// `<root>/document-<id>.pdf`
    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// `<root>/raster-<id>.tiff`
    pub fn raster_path(&self) -> &Path {
        &self.raster_path
    }
}

/// A single step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Copying the source into the staging root.
    Staging,
    /// Re-encoding the staged image and wrapping it in a PDF.
    ToDocument,
    /// Rasterising the PDF to TIFF via the external process.
    ToRaster,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Staging => "staging",
            Stage::ToDocument => "converting to document",
            Stage::ToRaster => "converting to raster",
        })
    }
}

/// Lifecycle of an invocation.
///
/// `Created → Running(Staging) → Running(ToDocument) → Running(ToRaster) → Completed`,
/// with `Failed(stage)` reachable from any running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "stage")]
pub enum InvocationState {
    Created,
    Running(Stage),
    Completed,
    Failed(Stage),
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Completed | InvocationState::Failed(_))
    }
}
