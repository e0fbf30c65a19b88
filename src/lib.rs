//! # resume-tailor
//!
//! Tailor a résumé to a job description with a fixed-order LLM pipeline:
//! ATS-readability audit, targeted feedback, a draft cover letter, and an
//! interview-prep question set, all from one PDF and one job description.
//!
//! ## Pipeline
//!
//! ```text
//!                 ┌────────────────┐
//!  resume.pdf ───▶│  text extract  │──┐
//!                 └────────────────┘  │
//!                 ┌────────────────┐  ▼
//!                 │  VISUAL_CHECK  │ (optional: rendered page vs. text)
//!                 └───────┬────────┘
//!                         ▼
//!                 ┌────────────────┐
//!                 │   ATS_AUDIT    │ (optional: score + report)
//!                 └───────┬────────┘
//!                         ▼
//!                 ┌────────────────┐
//!  job desc ─────▶│PROFILE_ANALYSIS│ (required: feedback, cover letter,
//!                 └───────┬────────┘  topics, experience level)
//!                         ▼
//!                 ┌────────────────┐
//!                 │ QUESTION_GEN   │ (optional: interview prep docs)
//!                 └────────────────┘
//! ```
//!
//! Stages run strictly in order, exactly once, with no retries. Optional
//! stages that fail leave their slice of the result empty; only input
//! validation and the profile-analysis stage can end a run fatally.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use resume_tailor::{Pipeline, PipelineConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .output_dir("tailor-output")
//!         .build()?;
//!
//!     let pipeline = Pipeline::new(config)?;
//!     let result = pipeline
//!         .process_file(Path::new("resume.pdf"), "Senior Rust engineer…")
//!         .await;
//!
//!     if let Some(fatal) = &result.fatal_error {
//!         eprintln!("run failed: {fatal}");
//!     } else {
//!         println!("ATS score: {}/10", result.ats_score);
//!         println!("{}", result.cover_letter);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | yes     | The `resume-tailor` binary (clap, indicatif, tracing-subscriber) |

pub mod backend;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

pub use backend::{BackendError, GenerativeBackend, DEFAULT_MODEL};
pub use config::{PipelineConfig, PipelineConfigBuilder, RedactionAuditPolicy};
pub use error::{StageError, TailorError};
pub use orchestrator::Pipeline;
pub use output::{
    ExperienceLevel, QuestionCategory, QuestionItem, RunResult, RunStats, VisualWarning,
};
pub use pipeline::extract::PageRenderer;
pub use progress::{NoopProgress, RunProgressCallback};
