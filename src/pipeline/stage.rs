//! The stage executor: one "invoke model → parse structured result" unit.
//!
//! A stage never raises past its own boundary. Whatever goes wrong — the
//! backend call fails, the call times out, the response is unparseable —
//! the failure is folded into the returned [`StageOutcome`] and the
//! orchestrator alone decides what it means (absent optional result vs.
//! fatal run). This is what isolates a bad stage from corrupting the rest
//! of the run.
//!
//! The prompt is fully determined by state available at invocation time:
//! the executor receives it pre-built and never touches pipeline state.

use edgequake_llm::ImageData;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::backend::GenerativeBackend;
use crate::error::StageError;
use crate::pipeline::parse::ParseFailure;

/// Result of a single stage execution.
#[derive(Debug)]
pub struct StageOutcome<T> {
    /// Parsed value, present on success.
    pub value: Option<T>,
    /// Why the stage failed, present on failure.
    pub error: Option<StageError>,
    pub duration_ms: u64,
}

impl<T> StageOutcome<T> {
    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }

    fn success(value: T, start: Instant) -> Self {
        Self {
            value: Some(value),
            error: None,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn failure(error: StageError, start: Instant) -> Self {
        Self {
            value: None,
            error: Some(error),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Execute one stage: invoke the backend once, bounded by `timeout_secs`,
/// and parse the raw response with `parse`.
///
/// No retries — a failed stage is simply a failed stage; the state machine
/// is strictly forward-progressing.
pub async fn run_stage<T, F>(
    stage: &'static str,
    backend: &dyn GenerativeBackend,
    prompt: String,
    image: Option<ImageData>,
    timeout_secs: u64,
    parse: F,
) -> StageOutcome<T>
where
    F: FnOnce(&str) -> Result<T, ParseFailure>,
{
    let start = Instant::now();
    debug!("stage '{}': invoking backend ({} prompt chars)", stage, prompt.len());

    let call = backend.generate(&prompt, image);
    let raw = match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
        Err(_) => {
            warn!("stage '{}': timed out after {}s", stage, timeout_secs);
            return StageOutcome::failure(
                StageError::Timeout {
                    stage: stage.to_string(),
                    secs: timeout_secs,
                },
                start,
            );
        }
        Ok(Err(e)) => {
            warn!("stage '{}': backend call failed: {}", stage, e);
            return StageOutcome::failure(
                StageError::Backend {
                    stage: stage.to_string(),
                    detail: e.to_string(),
                },
                start,
            );
        }
        Ok(Ok(raw)) => raw,
    };

    match parse(&raw) {
        Ok(value) => {
            debug!(
                "stage '{}': completed in {}ms",
                stage,
                start.elapsed().as_millis()
            );
            StageOutcome::success(value, start)
        }
        Err(failure) => {
            warn!("stage '{}': malformed response: {}", stage, failure.snippet);
            StageOutcome::failure(
                StageError::Malformed {
                    stage: stage.to_string(),
                    snippet: failure.snippet,
                },
                start,
            )
        }
    }
}
