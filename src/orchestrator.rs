//! The pipeline orchestrator: a fixed-order, forward-only state machine.
//!
//! ```text
//! START ─▶ VISUAL_CHECK ─▶ ATS_AUDIT ─▶ PROFILE_ANALYSIS ─▶ QUESTION_GENERATION ─▶ DONE
//!   │        (optional)     (optional)     (required)          (optional)
//!   └────────────────────────────────────────┴──▶ FATAL
//! ```
//!
//! No state is revisited, no stage is retried, and no stage re-derives
//! what an earlier stage already produced: the detected experience level,
//! the topic set, and the visual-risk flag are carried forward as
//! authoritative derived state. Optional stages that fail are recorded as
//! absent and the machine advances; only START validation and the batched
//! profile-analysis stage can end the run fatally.

use async_trait::async_trait;
use edgequake_llm::ImageData;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::backend::{resolve_provider, BackendError, EdgequakeBackend, GenerativeBackend};
use crate::config::PipelineConfig;
use crate::error::{StageError, TailorError};
use crate::output::{
    self, ArtifactSink, ExperienceLevel, QuestionItem, RunResult, RunStats, VisualWarning,
};
use crate::pipeline::extract::{self, PageRenderer, PdfiumRenderer};
use crate::pipeline::parse::{self, ParseFailure};
use crate::pipeline::sanitize;
use crate::pipeline::stage::{run_stage, StageOutcome};
use crate::pipeline::visual::{self, VisualRisk};
use crate::pipeline::websearch::WebQuestionSource;
use crate::progress::{NoopProgress, ProgressCallback};
use crate::prompts::{self, AtsConstraint, TopicSpec};

// Stage names, as reported through logs and progress callbacks.
pub const STAGE_VISUAL_CHECK: &str = "visual_check";
pub const STAGE_ATS_AUDIT: &str = "ats_audit";
pub const STAGE_PROFILE_ANALYSIS: &str = "profile_analysis";
pub const STAGE_QUESTION_GENERATION: &str = "question_generation";

// ── Stage response contracts ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AtsAuditResponse {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    critical_issues: Vec<String>,
    #[serde(default)]
    report: String,
}

/// Feedback arrives either as one string or as a list of bullet strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedbackText {
    One(String),
    Many(Vec<String>),
}

impl Default for FeedbackText {
    fn default() -> Self {
        FeedbackText::One(String::new())
    }
}

impl FeedbackText {
    fn into_text(self) -> String {
        match self {
            FeedbackText::One(s) => s,
            FeedbackText::Many(lines) => output::join_feedback(&lines),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    feedback: FeedbackText,
    #[serde(default)]
    cover_letter: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    experience_level: ExperienceLevel,
}

/// Accepts either a bare JSON array of questions or an object wrapping the
/// array under a "questions" key — models produce both.
fn parse_questions(raw: &str) -> Result<Vec<QuestionItem>, ParseFailure> {
    let value = parse::extract_json(raw)?;
    let candidate = match value {
        serde_json::Value::Object(ref map) => {
            map.get("questions").cloned().unwrap_or(value)
        }
        other => other,
    };
    serde_json::from_value(candidate).map_err(|_| ParseFailure::from_raw(raw))
}

/// Per-run view of the shared backend that counts actual model invocations.
/// A stage that bails before reaching the backend (render failure, encoding
/// failure) never touches the counter.
struct CountingBackend<'a> {
    inner: &'a dyn GenerativeBackend,
    calls: AtomicU32,
}

impl<'a> CountingBackend<'a> {
    fn new(inner: &'a dyn GenerativeBackend) -> Self {
        Self {
            inner,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GenerativeBackend for CountingBackend<'_> {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.generate(prompt, image).await
    }
}

fn render_ats_report(score: u8, critical_issues: &[String], report: &str) -> String {
    let mut out = format!("ATS readability score: {score}/10\n\n{}\n", report.trim());
    if !critical_issues.is_empty() {
        out.push_str("\nCritical issues:\n");
        for issue in critical_issues {
            out.push_str(&format!("- {issue}\n"));
        }
    }
    out
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// One configured tailoring pipeline. Cheap to clone via its `Arc`'d
/// collaborators; every call to a `process*` method is an isolated run
/// with no shared derived state.
pub struct Pipeline {
    config: PipelineConfig,
    backend: Arc<dyn GenerativeBackend>,
    renderer: Arc<dyn PageRenderer>,
}

impl Pipeline {
    /// Build a pipeline from a configuration, resolving the model backend.
    ///
    /// Fails only when no backend can be constructed (missing API keys and
    /// no injected backend).
    pub fn new(config: PipelineConfig) -> Result<Self, TailorError> {
        let backend: Arc<dyn GenerativeBackend> = match config.backend.clone() {
            Some(b) => b,
            None => {
                let provider = resolve_provider(
                    config.provider_name.as_deref(),
                    config.model.as_deref(),
                )?;
                Arc::new(EdgequakeBackend::new(
                    provider,
                    config.temperature,
                    config.max_tokens,
                ))
            }
        };

        let renderer: Arc<dyn PageRenderer> = config
            .renderer
            .clone()
            .unwrap_or_else(|| Arc::new(PdfiumRenderer));

        Ok(Self {
            config,
            backend,
            renderer,
        })
    }

    /// Run the pipeline against a résumé PDF on disk: extract the text
    /// layer, then [`Self::process`]. An absent text layer (scanned image)
    /// is a START-equivalent fatal outcome.
    pub async fn process_file(&self, document: &Path, job_description: &str) -> RunResult {
        let path = match extract::resolve_document(document) {
            Ok(p) => p,
            Err(e) => return self.fatal(e.to_string()),
        };

        match extract::extract_text(&path).await {
            Err(e) => self.fatal(e.to_string()),
            Ok(None) => self.fatal(TailorError::EmptyResumeText.to_string()),
            Ok(Some(text)) => self.process(Some(&path), &text, job_description).await,
        }
    }

    /// Run the pipeline against in-memory PDF bytes.
    ///
    /// The bytes land in a uniquely named temp file that is removed on
    /// every exit path — success, stage failure, or fatal abort — when the
    /// guard drops. Concurrent runs therefore never see each other's
    /// input documents.
    pub async fn process_bytes(&self, bytes: &[u8], job_description: &str) -> RunResult {
        let mut tmp = match tempfile::Builder::new()
            .prefix("resume-tailor-")
            .suffix(".pdf")
            .tempfile()
        {
            Ok(t) => t,
            Err(e) => return self.fatal(format!("could not stage input document: {e}")),
        };
        if let Err(e) = tmp.write_all(bytes) {
            return self.fatal(format!("could not stage input document: {e}"));
        }

        self.process_file(tmp.path(), job_description).await
    }

    /// Run the pipeline. This is the single entry point the presentation
    /// layer consumes; it is synchronous from the caller's perspective and
    /// bounded by the sum of per-stage timeouts.
    ///
    /// `document` is only needed for the visual check; pass `None` to run
    /// text-only.
    pub async fn process(
        &self,
        document: Option<&Path>,
        resume_text: &str,
        job_description: &str,
    ) -> RunResult {
        let total_start = Instant::now();
        let progress: ProgressCallback = self
            .config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgress));

        // ── START: the only externally visible hard stop ─────────────────
        // Even an aborted run must signal completion, so hosts driving a
        // spinner or status widget off the callback can tear it down.
        if resume_text.trim().is_empty() {
            progress.on_run_complete(true);
            return RunResult::fatal(TailorError::EmptyResumeText.to_string());
        }
        if job_description.trim().is_empty() {
            progress.on_run_complete(true);
            return RunResult::fatal(TailorError::EmptyJobDescription.to_string());
        }

        info!(
            "run started: {} résumé chars, {} JD chars",
            resume_text.len(),
            job_description.len()
        );
        progress.on_run_start();

        let sink = self.config.output_dir.clone().map(ArtifactSink::new);
        let backend = CountingBackend::new(self.backend.as_ref());
        let mut result = RunResult::default();
        let mut stats = RunStats::default();

        // ── VISUAL_CHECK (optional, advisory) ────────────────────────────
        let mut ats_constraint: Option<AtsConstraint> = None;
        match (self.config.visual_check, document) {
            (true, Some(doc)) => {
                progress.on_stage_start(STAGE_VISUAL_CHECK);
                let stage_start = Instant::now();
                let assessment = visual::assess(
                    self.renderer.as_ref(),
                    &backend,
                    doc,
                    resume_text,
                    self.config.visual_text_prefix_chars,
                    self.config.api_timeout_secs,
                )
                .await;
                stats.visual_check_ms = stage_start.elapsed().as_millis() as u64;

                match assessment {
                    Some(a) => {
                        progress.on_stage_complete(STAGE_VISUAL_CHECK);
                        self.persist(sink.as_ref(), output::VISUAL_CHECK_FILE, &a.report())
                            .await;
                        if a.risk == VisualRisk::High {
                            info!("visual check: HIGH risk — audit constraint armed");
                            ats_constraint = Some(AtsConstraint::visual_mismatch());
                            result.visual_warning = Some(VisualWarning {
                                issue: a.issue_detected,
                                advice: a.advice,
                            });
                        }
                    }
                    None => {
                        // Advisory check: absence is not an error.
                        progress.on_stage_failed(STAGE_VISUAL_CHECK, "check unavailable");
                    }
                }
            }
            (true, None) => {
                progress.on_stage_skipped(STAGE_VISUAL_CHECK, "no document handle");
            }
            (false, _) => {
                progress.on_stage_skipped(STAGE_VISUAL_CHECK, "capability off");
            }
        }

        // ── ATS_AUDIT (optional, best-effort) ────────────────────────────
        let audit_view;
        let audit_input: &str = if self.config.sanitize_for_audit {
            audit_view = sanitize::sanitize(resume_text);
            debug!("audit input sanitised: {} redactions", audit_view.redaction_count());
            &audit_view.redacted
        } else {
            resume_text
        };

        progress.on_stage_start(STAGE_ATS_AUDIT);
        let audit_outcome: StageOutcome<AtsAuditResponse> = run_stage(
            STAGE_ATS_AUDIT,
            &backend,
            prompts::ats_audit_prompt(
                audit_input,
                ats_constraint.as_ref(),
                self.config.redaction_policy,
            ),
            None,
            self.config.api_timeout_secs,
            parse::parse_stage_value,
        )
        .await;
        stats.ats_audit_ms = audit_outcome.duration_ms;

        match audit_outcome.value {
            Some(audit) => {
                let mut score = audit.score.round().clamp(0.0, 10.0) as u8;
                let mut issues = audit.critical_issues;
                // The visual check saw the rendered page; its verdict
                // overrides the text-only audit's judgment.
                if let Some(c) = &ats_constraint {
                    score = score.min(c.max_score);
                    if !issues.iter().any(|i| i == c.diagnostic) {
                        issues.push(c.diagnostic.to_string());
                    }
                }
                result.ats_score = score;
                result.ats_report = render_ats_report(score, &issues, &audit.report);
                progress.on_stage_complete(STAGE_ATS_AUDIT);
                self.persist(sink.as_ref(), output::ATS_REPORT_FILE, &result.ats_report)
                    .await;
            }
            None => {
                let detail = audit_outcome
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                warn!("ATS audit absent: {detail}");
                progress.on_stage_failed(STAGE_ATS_AUDIT, &detail);
            }
        }

        // ── PROFILE_ANALYSIS (required) ──────────────────────────────────
        // One batched call produces feedback, the cover letter, the topic
        // set, and the experience level. The cover letter needs real
        // contact details, so this stage always sees the unredacted text.
        progress.on_stage_start(STAGE_PROFILE_ANALYSIS);
        let profile_outcome: StageOutcome<ProfileResponse> = run_stage(
            STAGE_PROFILE_ANALYSIS,
            &backend,
            prompts::profile_analysis_prompt(resume_text, job_description),
            None,
            self.config.api_timeout_secs,
            parse::parse_stage_value,
        )
        .await;
        stats.profile_analysis_ms = profile_outcome.duration_ms;

        let profile = match profile_outcome.value {
            Some(p) => p,
            None => {
                let source = profile_outcome.error.unwrap_or(StageError::Backend {
                    stage: STAGE_PROFILE_ANALYSIS.to_string(),
                    detail: "unknown failure".to_string(),
                });
                error!("required stage failed: {source}");
                progress.on_stage_failed(STAGE_PROFILE_ANALYSIS, &source.to_string());
                progress.on_run_complete(true);
                // Earlier optional artifacts stay valid and surfaced;
                // everything downstream of the profile is discarded.
                result.fatal_error =
                    Some(TailorError::ProfileAnalysisFailed { source }.to_string());
                stats.total_ms = total_start.elapsed().as_millis() as u64;
                stats.backend_calls = backend.calls();
                result.stats = stats;
                return result;
            }
        };

        result.feedback = profile.feedback.into_text();
        result.cover_letter = profile.cover_letter;
        result.experience_level = profile.experience_level;
        let topics: Vec<TopicSpec> = profile
            .topics
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .take(self.config.max_topics)
            .map(TopicSpec::new)
            .collect();
        info!(
            "profile analysis: level {}, topics {:?}",
            result.experience_level,
            topics.iter().map(|t| t.topic.as_str()).collect::<Vec<_>>()
        );
        progress.on_stage_complete(STAGE_PROFILE_ANALYSIS);

        self.persist(sink.as_ref(), output::FEEDBACK_FILE, &result.feedback)
            .await;
        self.persist(sink.as_ref(), output::COVER_LETTER_FILE, &result.cover_letter)
            .await;

        // ── QUESTION_GENERATION (optional, needs a non-empty topic set) ──
        if topics.is_empty() {
            // Degenerate, not an error: the prep documents exist but hold
            // no entries.
            progress.on_stage_skipped(STAGE_QUESTION_GENERATION, "empty topic set");
        } else {
            let reference = self
                .gather_reference_material(&topics, result.experience_level)
                .await;

            progress.on_stage_start(STAGE_QUESTION_GENERATION);
            let question_outcome: StageOutcome<Vec<QuestionItem>> = run_stage(
                STAGE_QUESTION_GENERATION,
                &backend,
                prompts::question_generation_prompt(
                    &topics,
                    result.experience_level,
                    self.config.questions_per_topic,
                    reference.as_deref(),
                ),
                None,
                self.config.api_timeout_secs,
                parse_questions,
            )
            .await;
            stats.question_generation_ms = question_outcome.duration_ms;

            match question_outcome.value {
                Some(questions) => {
                    result.questions = questions;
                    progress.on_stage_complete(STAGE_QUESTION_GENERATION);
                }
                None => {
                    let detail = question_outcome
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    warn!("question generation absent: {detail}");
                    progress.on_stage_failed(STAGE_QUESTION_GENERATION, &detail);
                }
            }
        }

        // ── DONE ─────────────────────────────────────────────────────────
        result.questions_doc =
            output::render_questions_doc(&result.questions, result.experience_level);
        result.solutions_doc = output::render_solutions_doc(&result.questions);
        self.persist(sink.as_ref(), output::QUESTIONS_FILE, &result.questions_doc)
            .await;
        self.persist(sink.as_ref(), output::SOLUTIONS_FILE, &result.solutions_doc)
            .await;

        stats.total_ms = total_start.elapsed().as_millis() as u64;
        stats.backend_calls = backend.calls();
        info!(
            "run complete in {}ms ({} backend calls)",
            stats.total_ms, stats.backend_calls
        );
        result.stats = stats;
        progress.on_run_complete(false);
        result
    }

    /// Build a fatal result for a run that never reached `process`, firing
    /// the completion callback so hosts can tear down progress UI.
    fn fatal(&self, message: impl Into<String>) -> RunResult {
        if let Some(cb) = &self.config.progress_callback {
            cb.on_run_complete(true);
        }
        RunResult::fatal(message)
    }

    /// Best-effort gathering of real question material from the web.
    async fn gather_reference_material(
        &self,
        topics: &[TopicSpec],
        level: ExperienceLevel,
    ) -> Option<String> {
        if !self.config.web_search_questions {
            return None;
        }

        let source = match WebQuestionSource::new(self.config.fetch_timeout_secs) {
            Ok(s) => s,
            Err(e) => {
                warn!("web question source unavailable: {e}");
                return None;
            }
        };

        let mut chunks = Vec::new();
        for t in topics {
            if let Some((url, text)) = source.gather_reference_material(&t.topic, level).await {
                chunks.push(format!("[source: {url}]\n{text}"));
            }
        }

        if chunks.is_empty() {
            None
        } else {
            Some(chunks.join("\n\n"))
        }
    }

    /// Write one artifact if a sink is configured. Write failures are
    /// logged, not fatal — the in-memory result is still complete.
    async fn persist(&self, sink: Option<&ArtifactSink>, name: &str, content: &str) {
        if let Some(sink) = sink {
            match sink.write(name, content).await {
                Ok(path) => debug!("wrote {}", path.display()),
                Err(e) => warn!("{e}"),
            }
        }
    }
}
