//! Error types for the resume-tailor library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TailorError`] — **Fatal**: the run cannot proceed at all (unreadable
//!   résumé, empty job description, provider not configured) or the one
//!   required stage failed. Surfaced to the caller as the `fatal_error`
//!   field of [`crate::output::RunResult`].
//!
//! * [`StageError`] — **Stage-local**: one optional stage failed (model call
//!   timed out, response unparseable, first page could not be rendered) but
//!   the rest of the run is fine. Absorbed by the orchestrator and recorded
//!   as an absent/default value in the final result.
//!
//! The separation keeps the propagation policy honest: nothing short of a
//! fatal input problem or a required-stage failure ever reaches the caller
//! as an error, so the user always receives whatever succeeded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced by the resume-tailor library.
///
/// Stage-level failures use [`StageError`] and are absorbed by the
/// orchestrator rather than propagated here.
#[derive(Debug, Error)]
pub enum TailorError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Résumé file was not found at the given path.
    #[error("Résumé file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The PDF could not be opened or its text layer could not be read.
    #[error("Could not read résumé '{path}': {detail}")]
    DocumentUnreadable { path: PathBuf, detail: String },

    /// Text extraction yielded nothing usable.
    #[error("No readable text found in the résumé. The PDF is probably a scanned image — export a text-based PDF and try again.")]
    EmptyResumeText,

    /// The job description input was empty.
    #[error("The job description is empty. Paste the target job posting text.")]
    EmptyJobDescription,

    // ── Backend errors ────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The required profile-analysis stage failed.
    ///
    /// The user-visible message is deliberately generic; the underlying
    /// [`StageError`] (with the raw-response snippet) is available via
    /// `source` for logs only.
    #[error("Profile analysis failed. No feedback or cover letter could be produced — please try again.")]
    ProfileAnalysisFailed {
        #[source]
        source: StageError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write artifact '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single pipeline stage.
///
/// Recorded inside [`crate::pipeline::stage::StageOutcome`] when a stage
/// fails. The run continues; only the required profile-analysis stage
/// escalates its `StageError` to [`TailorError::ProfileAnalysisFailed`].
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum StageError {
    /// The model backend call itself failed (network, auth, rate limit).
    /// Rate-limit and quota errors are deliberately not distinguished here.
    #[error("Stage '{stage}': backend call failed: {detail}")]
    Backend { stage: String, detail: String },

    /// The model backend call exceeded the configured timeout.
    #[error("Stage '{stage}': backend call timed out after {secs}s")]
    Timeout { stage: String, secs: u64 },

    /// The model responded, but no valid JSON structure could be recovered.
    /// `snippet` is the raw response truncated for diagnostics.
    #[error("Stage '{stage}': malformed structured output: {snippet}")]
    Malformed { stage: String, snippet: String },

    /// The first page of the document could not be rasterised.
    #[error("First-page render unavailable: {detail}")]
    RenderUnavailable { detail: String },

    /// A web fetch for reference material failed or timed out.
    #[error("Fetch failed for '{url}': {detail}")]
    Fetch { url: String, detail: String },
}
