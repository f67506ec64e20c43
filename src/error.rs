//! Error types for the docstage library.
//!
//! Every stage of the pipeline fails with a [`PipelineError`]. The first
//! error encountered aborts the invocation and is returned unchanged: a
//! staging failure is never re-labelled as a conversion failure further up.
//! Each variant carries the path (or program) that failed so a caller can
//! tell which artifact was involved without parsing the message.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// All fatal errors returned by the docstage library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Source errors ─────────────────────────────────────────────────────
    /// The source image was not found at the given path.
    #[error("Source image not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Process does not have read permission on the source.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source opened but its bytes could not be read.
    #[error("Failed to read source image '{path}': {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // ── Staging errors ────────────────────────────────────────────────────
    /// Could not create, fill or flush the staged copy of the source.
    #[error("Failed to write staged file '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // ── Raster-to-document errors ─────────────────────────────────────────
    /// The staged bytes are not a recognisable raster image.
    #[error("Could not decode image '{path}': {source}")]
    DecodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image could not be re-encoded as JPEG.
    #[error("Could not re-encode image '{path}' as JPEG: {source}")]
    EncodeFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The in-memory document could not be serialised.
    #[error("Failed to build document '{path}': {detail}")]
    DocumentBuildFailed { path: PathBuf, detail: String },

    /// Writing the serialised document to disk failed.
    ///
    /// A partially written file may remain at `path`.
    #[error("Failed to write document '{path}': {source}")]
    DocumentWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An existing document could not be read back or parsed.
    #[error("Failed to read document '{path}': {detail}")]
    DocumentReadFailed { path: PathBuf, detail: String },

    // ── Rasterizer errors ─────────────────────────────────────────────────
    /// The rasterizer executable could not be found.
    #[error("Rasterizer '{program}' not found.\nInstall Ghostscript or pass --gs /path/to/gs.")]
    RasterizerNotFound { program: PathBuf },

    /// The rasterizer executable exists but could not be started.
    #[error("Failed to launch rasterizer '{program}': {source}")]
    RasterizerLaunchFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The rasterizer ran and exited unsuccessfully.
    #[error("Rasterizer '{program}' exited with {}: {diagnostic}", exit_label(.code))]
    RasterizerFailed {
        program: PathBuf,
        code: Option<i32>,
        diagnostic: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `process_upload` was called twice on the same processor.
    #[error("Invocation {id} has already run; create a new processor per upload")]
    AlreadyRun { id: Uuid },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True when a write failed because the target directory does not exist.
    ///
    /// This is the signature of an unprovisioned staging root.
    pub fn is_missing_directory(&self) -> bool {
        match self {
            PipelineError::StagingFailed { source, .. }
            | PipelineError::DocumentWriteFailed { source, .. } => {
                source.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_failure_names_path() {
        let e = PipelineError::StagingFailed {
            path: PathBuf::from("/missing/image-1.tif"),
            source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/missing/image-1.tif"), "got: {msg}");
        assert!(msg.contains("No such file or directory"), "got: {msg}");
        assert!(e.is_missing_directory());
    }

    #[test]
    fn permission_denied_is_not_missing_directory() {
        let e = PipelineError::StagingFailed {
            path: PathBuf::from("/ro/image-1.tif"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!e.is_missing_directory());
        assert!(!PipelineError::SourceNotFound { path: "x".into() }.is_missing_directory());
    }

    #[test]
    fn source_read_failure_names_source_not_dest() {
        let e = PipelineError::SourceReadFailed {
            path: PathBuf::from("/uploads/scan.tif"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone mid-read"),
        };
        assert!(e.to_string().contains("/uploads/scan.tif"));
        assert!(!e.is_missing_directory());
    }

    #[test]
    fn rasterizer_failed_display() {
        let e = PipelineError::RasterizerFailed {
            program: PathBuf::from("gs"),
            code: Some(1),
            diagnostic: "Unrecoverable error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("code 1"), "got: {msg}");
        assert!(msg.contains("Unrecoverable error"), "got: {msg}");
    }

    #[test]
    fn rasterizer_killed_display() {
        let e = PipelineError::RasterizerFailed {
            program: PathBuf::from("gs"),
            code: None,
            diagnostic: String::new(),
        };
        assert!(e.to_string().contains("a signal"));
    }
}
