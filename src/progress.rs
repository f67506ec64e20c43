//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn StageProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as an invocation moves through staging, document conversion and
//! rasterisation.
//!
//! # Example
//!
//! ```rust
//! use docstage::{PipelineConfig, Stage, StageProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//! use uuid::Uuid;
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, id: Uuid, stage: Stage, artifact: &Path) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{id}: {stage} wrote {}", artifact.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn StageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::invocation::Stage;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Called by the orchestrator as an invocation advances.
///
/// Implementations must be `Send + Sync`: several invocations sharing one
/// config may run concurrently and report through the same callback. All
/// methods have default no-op implementations.
pub trait StageProgressCallback: Send + Sync {
    /// Called once when the invocation starts, before staging.
    fn on_invocation_start(&self, id: Uuid) {
        let _ = id;
    }

    /// Called just before a stage begins.
    fn on_stage_start(&self, id: Uuid, stage: Stage) {
        let _ = (id, stage);
    }

    /// Called when a stage has fully written its artifact.
    fn on_stage_complete(&self, id: Uuid, stage: Stage, artifact: &Path) {
        let _ = (id, stage, artifact);
    }

    /// Called when a stage fails. No further stage events follow.
    fn on_stage_error(&self, id: Uuid, stage: Stage, error: &str) {
        let _ = (id, stage, error);
    }

    /// Called once when the invocation reaches a terminal state.
    fn on_invocation_complete(&self, id: Uuid, success: bool) {
        let _ = (id, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn StageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl StageProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _id: Uuid, _stage: Stage) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _id: Uuid, _stage: Stage, _artifact: &Path) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_error(&self, _id: Uuid, _stage: Stage, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        let id = Uuid::new_v4();
        cb.on_invocation_start(id);
        cb.on_stage_start(id, Stage::Staging);
        cb.on_stage_complete(id, Stage::Staging, Path::new("/tmp/x"));
        cb.on_stage_error(id, Stage::ToRaster, "boom");
        cb.on_invocation_complete(id, false);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let id = Uuid::new_v4();

        tracker.on_stage_start(id, Stage::Staging);
        tracker.on_stage_complete(id, Stage::Staging, Path::new("a"));
        tracker.on_stage_start(id, Stage::ToDocument);
        tracker.on_stage_error(id, Stage::ToDocument, "decode");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
