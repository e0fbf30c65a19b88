//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an `Arc<dyn RunProgressCallback>` via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the orchestrator moves through the stage sequence. Callbacks
//! are the least-invasive integration point: a host can forward them to a
//! terminal spinner, a status widget, or a log without the library knowing
//! how the host communicates.

use std::sync::Arc;

/// Called by the orchestrator as the run advances. All methods default to
/// no-ops so implementors only override what they care about.
///
/// Stages execute strictly sequentially within a run, so unlike a
/// page-parallel pipeline these methods are never called concurrently for
/// the same run.
pub trait RunProgressCallback: Send + Sync {
    /// Called once after START validation, before the first stage.
    fn on_run_start(&self) {}

    /// Called just before a stage's backend call.
    fn on_stage_start(&self, stage: &str) {
        let _ = stage;
    }

    /// Called when a stage produced a usable result.
    fn on_stage_complete(&self, stage: &str) {
        let _ = stage;
    }

    /// Called when an optional stage was skipped (capability off, missing
    /// prerequisite, empty topic set).
    fn on_stage_skipped(&self, stage: &str, reason: &str) {
        let _ = (stage, reason);
    }

    /// Called when a stage failed; `error` is human-readable.
    fn on_stage_failed(&self, stage: &str, error: &str) {
        let _ = (stage, error);
    }

    /// Called once when the run finishes, fatally or not. When input
    /// validation fails this fires without a preceding [`Self::on_run_start`].
    fn on_run_complete(&self, fatal: bool) {
        let _ = fatal;
    }
}

/// No-op implementation used when no callback is configured.
pub struct NoopProgress;

impl RunProgressCallback for NoopProgress {}

/// Convenience alias matching the type stored in the config.
pub type ProgressCallback = Arc<dyn RunProgressCallback>;
