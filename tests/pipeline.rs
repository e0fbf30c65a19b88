//! End-to-end pipeline tests against a scripted backend.
//!
//! No network, no model, no pdfium: the backend is a queue of canned
//! responses and the renderer returns a tiny in-memory image. This is the
//! same seam the production pipeline runs through, so stage ordering,
//! cross-stage constraints, and artifact persistence are all exercised for
//! real.

use async_trait::async_trait;
use edgequake_llm::ImageData;
use image::DynamicImage;
use resume_tailor::{
    BackendError, GenerativeBackend, PageRenderer, Pipeline, PipelineConfig,
    RunProgressCallback, RunResult, StageError,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────

/// Pops one scripted response per call and records every prompt it saw.
struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(
        &self,
        prompt: &str,
        _image: Option<ImageData>,
    ) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(BackendError::new(msg)),
            None => Err(BackendError::new("scripted backend exhausted")),
        }
    }
}

/// Renders a fixed 1×1 image for any document.
struct FixedRenderer;

#[async_trait]
impl PageRenderer for FixedRenderer {
    async fn render_first_page(&self, _document: &Path) -> Result<DynamicImage, StageError> {
        Ok(DynamicImage::new_rgb8(1, 1))
    }
}

struct FailingRenderer;

#[async_trait]
impl PageRenderer for FailingRenderer {
    async fn render_first_page(&self, _document: &Path) -> Result<DynamicImage, StageError> {
        Err(StageError::RenderUnavailable {
            detail: "no rasteriser in tests".into(),
        })
    }
}

/// Records every run-completion signal it receives.
#[derive(Default)]
struct RecordingProgress {
    completions: Mutex<Vec<bool>>,
}

impl RecordingProgress {
    fn completions(&self) -> Vec<bool> {
        self.completions.lock().unwrap().clone()
    }
}

impl RunProgressCallback for RecordingProgress {
    fn on_run_complete(&self, fatal: bool) {
        self.completions.lock().unwrap().push(fatal);
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const RESUME: &str = "Jane Doe\njane.doe@example.com | 555-867-5309\n\
    Software engineer with 6 years of Python and SQL experience.";
const JD: &str = "We need a Mid-Level engineer strong in Python and SQL.";

fn visual_low() -> Result<String, String> {
    Ok(r#"{"risk": "LOW", "issue_detected": "none", "advice": "none"}"#.into())
}

fn visual_high() -> Result<String, String> {
    Ok(r#"{"risk": "HIGH", "issue_detected": "two-column layout scrambles reading order", "advice": "switch to a single-column layout"}"#.into())
}

fn audit_ok(score: u8) -> Result<String, String> {
    Ok(format!(
        r#"{{"score": {score}, "critical_issues": ["dates use inconsistent formats"], "report": "Mostly parseable."}}"#
    ))
}

fn profile_ok(topics: &str) -> Result<String, String> {
    Ok(format!(
        r#"{{"feedback": ["Lead with the Python work", "Quantify the SQL migrations"],
            "cover_letter": "Dear Hiring Manager,\n\nI am Jane Doe…",
            "topics": {topics},
            "experience_level": "Mid-Level"}}"#
    ))
}

fn questions_ok() -> Result<String, String> {
    Ok(r#"[
        {"topic": "Python", "category": "coding", "is_real": false,
         "question": "Reverse a linked list.", "starter_code": "def reverse(head): ...",
         "solution": "Walk the list keeping a prev pointer.", "complexity": "O(n)",
         "source_url": null},
        {"topic": "SQL", "category": "coding", "is_real": false,
         "question": "Find the second-highest salary.", "starter_code": null,
         "solution": "Use DENSE_RANK in a subquery.", "complexity": null,
         "source_url": null}
    ]"#
    .into())
}

struct Run {
    backend: Arc<ScriptedBackend>,
    result: RunResult,
}

async fn run_pipeline(
    responses: Vec<Result<String, String>>,
    configure: impl FnOnce(resume_tailor::PipelineConfigBuilder) -> resume_tailor::PipelineConfigBuilder,
    document: Option<&Path>,
) -> Run {
    let backend = ScriptedBackend::new(responses);
    let config = configure(
        PipelineConfig::builder()
            .backend(backend.clone())
            .renderer(Arc::new(FixedRenderer)),
    )
    .build()
    .unwrap();
    let pipeline = Pipeline::new(config).unwrap();
    let result = pipeline.process(document, RESUME, JD).await;
    Run { backend, result }
}

// ── Full run ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_produces_all_outputs() {
    let doc = Path::new("ignored.pdf");
    let run = run_pipeline(
        vec![
            visual_low(),
            audit_ok(8),
            profile_ok(r#"["Python", "SQL"]"#),
            questions_ok(),
        ],
        |b| b,
        Some(doc),
    )
    .await;

    let r = &run.result;
    assert!(r.fatal_error.is_none());
    assert_eq!(run.backend.calls(), 4);
    assert_eq!(r.ats_score, 8);
    assert!(r.ats_report.contains("8/10"));
    assert!(r.visual_warning.is_none(), "LOW risk must not warn");
    assert_eq!(r.feedback, "- Lead with the Python work\n- Quantify the SQL migrations");
    assert!(r.cover_letter.starts_with("Dear Hiring Manager"));
    assert!(!r.cover_letter.contains("[Your Name]"));
    assert_eq!(r.experience_level.to_string(), "Mid-Level");
    assert_eq!(r.questions.len(), 2);
    assert!(r.questions_doc.contains("Q1 [Python — coding]"));
    assert!(r.questions_doc.contains("Q2 [SQL — coding]"));
    assert!(r.solutions_doc.contains("DENSE_RANK"));
    assert!(!r.questions_doc.contains("DENSE_RANK"), "solutions must not leak");
    assert_eq!(r.stats.backend_calls, 4);
}

#[tokio::test]
async fn stages_run_in_fixed_order() {
    let doc = Path::new("ignored.pdf");
    let run = run_pipeline(
        vec![
            visual_low(),
            audit_ok(7),
            profile_ok(r#"["Python"]"#),
            questions_ok(),
        ],
        |b| b,
        Some(doc),
    )
    .await;

    let prompts = run.backend.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[0].contains("layout-extraction mismatch"));
    assert!(prompts[1].contains("Applicant Tracking System"));
    assert!(prompts[2].contains("career coach"));
    assert!(prompts[3].contains("interview-preparation questions"));
}

// ── START validation ─────────────────────────────────────────────────────

#[tokio::test]
async fn empty_resume_is_fatal_before_any_call() {
    let backend = ScriptedBackend::new(vec![]);
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .renderer(Arc::new(FixedRenderer))
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let r = pipeline.process(None, "   \n\t ", JD).await;
    assert!(r.is_fatal());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn empty_job_description_is_fatal_before_any_call() {
    let backend = ScriptedBackend::new(vec![]);
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .renderer(Arc::new(FixedRenderer))
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let r = pipeline.process(None, RESUME, "").await;
    assert!(r.is_fatal());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn start_fatal_run_still_signals_completion() {
    let progress = Arc::new(RecordingProgress::default());
    let backend = ScriptedBackend::new(vec![]);
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .renderer(Arc::new(FixedRenderer))
        .progress_callback(progress.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let r = pipeline.process(None, "   ", JD).await;
    assert!(r.is_fatal());
    // A host driving a spinner off the callback must still see the run end.
    assert_eq!(progress.completions(), vec![true]);
    assert_eq!(backend.calls(), 0);
}

// ── Visual check behaviour ───────────────────────────────────────────────

#[tokio::test]
async fn high_visual_risk_caps_audit_score_and_adds_diagnostic() {
    let doc = Path::new("ignored.pdf");
    // Audit claims a 9 even though the prompt tells it not to — the
    // orchestrator enforces the ceiling regardless.
    let run = run_pipeline(
        vec![
            visual_high(),
            audit_ok(9),
            profile_ok("[]"),
        ],
        |b| b,
        Some(doc),
    )
    .await;

    let r = &run.result;
    assert!(r.ats_score <= 5, "score {} exceeds the visual-risk cap", r.ats_score);
    assert!(r.ats_report.contains("Visual layout does not match"));
    let warning = r.visual_warning.as_ref().expect("HIGH risk must surface a warning");
    assert!(warning.issue.contains("two-column"));
    assert!(warning.advice.contains("single-column"));

    // The audit prompt itself carried the constraint.
    let prompts = run.backend.prompts();
    assert!(prompts[1].contains("MUST NOT exceed 5"));
}

#[tokio::test]
async fn render_failure_degrades_to_no_visual_check() {
    let backend = ScriptedBackend::new(vec![
        audit_ok(7),
        profile_ok("[]"),
    ]);
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .renderer(Arc::new(FailingRenderer))
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let r = pipeline.process(Some(Path::new("ignored.pdf")), RESUME, JD).await;
    assert!(r.fatal_error.is_none());
    assert!(r.visual_warning.is_none());
    assert_eq!(r.ats_score, 7);
    // The backend never saw a visual-check prompt, and the stats only
    // count calls that actually reached the model.
    assert!(backend.prompts().iter().all(|p| !p.contains("layout-extraction")));
    assert_eq!(r.stats.backend_calls, 2);
}

#[tokio::test]
async fn visual_check_skipped_without_document() {
    let run = run_pipeline(
        vec![audit_ok(6), profile_ok("[]")],
        |b| b,
        None,
    )
    .await;
    assert_eq!(run.backend.calls(), 2);
    assert!(run.result.visual_warning.is_none());
}

// ── Audit sanitisation ───────────────────────────────────────────────────

#[tokio::test]
async fn audit_sees_redacted_text_profile_sees_original() {
    let run = run_pipeline(
        vec![audit_ok(7), profile_ok("[]")],
        |b| b.visual_check(false),
        None,
    )
    .await;

    let prompts = run.backend.prompts();
    let audit = &prompts[0];
    let profile = &prompts[1];
    assert!(!audit.contains("jane.doe@example.com"));
    assert!(!audit.contains("555-867-5309"));
    assert!(audit.contains("[EMAIL REDACTED]"));
    assert!(audit.contains("[PHONE REDACTED]"));
    // Cover letters need real contact details.
    assert!(profile.contains("jane.doe@example.com"));
}

#[tokio::test]
async fn sanitisation_can_be_disabled() {
    let run = run_pipeline(
        vec![audit_ok(7), profile_ok("[]")],
        |b| b.visual_check(false).sanitize_for_audit(false),
        None,
    )
    .await;
    assert!(run.backend.prompts()[0].contains("jane.doe@example.com"));
}

// ── Optional-stage failure containment ───────────────────────────────────

#[tokio::test]
async fn audit_failure_leaves_run_alive() {
    let run = run_pipeline(
        vec![
            Err("503 service unavailable".into()),
            profile_ok(r#"["Python"]"#),
            questions_ok(),
        ],
        |b| b.visual_check(false),
        None,
    )
    .await;

    let r = &run.result;
    assert!(r.fatal_error.is_none());
    assert_eq!(r.ats_score, 0);
    assert!(r.ats_report.is_empty());
    assert!(!r.feedback.is_empty());
    assert!(!r.questions.is_empty());
}

#[tokio::test]
async fn malformed_question_response_yields_empty_set() {
    let run = run_pipeline(
        vec![
            audit_ok(7),
            profile_ok(r#"["Python"]"#),
            Ok("I'd rather not produce JSON today.".into()),
        ],
        |b| b.visual_check(false),
        None,
    )
    .await;

    let r = &run.result;
    assert!(r.fatal_error.is_none());
    assert!(r.questions.is_empty());
    // Prep documents still exist, just with no entries.
    assert!(!r.questions_doc.is_empty());
    assert!(!r.solutions_doc.is_empty());
}

// ── Required-stage failure ───────────────────────────────────────────────

#[tokio::test]
async fn profile_failure_is_fatal_but_keeps_audit_results() {
    let run = run_pipeline(
        vec![
            audit_ok(6),
            Err("model overloaded".into()),
        ],
        |b| b.visual_check(false),
        None,
    )
    .await;

    let r = &run.result;
    let fatal = r.fatal_error.as_ref().expect("profile failure must be fatal");
    // User-facing message, not raw model/provider detail.
    assert!(!fatal.contains("model overloaded"));
    assert_eq!(r.ats_score, 6);
    assert!(!r.ats_report.is_empty());
    assert!(r.feedback.is_empty());
    assert!(r.questions.is_empty());
    assert_eq!(run.backend.calls(), 2);
}

// ── Topic handling ───────────────────────────────────────────────────────

#[tokio::test]
async fn empty_topic_set_skips_question_generation() {
    let run = run_pipeline(
        vec![audit_ok(7), profile_ok("[]")],
        |b| b.visual_check(false),
        None,
    )
    .await;

    assert_eq!(run.backend.calls(), 2, "no question-generation call expected");
    let r = &run.result;
    assert!(r.fatal_error.is_none());
    assert!(r.questions.is_empty());
    assert!(r.questions_doc.contains("No technical topics"));
}

#[tokio::test]
async fn topics_are_capped_at_configured_maximum() {
    let run = run_pipeline(
        vec![
            audit_ok(7),
            profile_ok(r#"["Python", "SQL", "Docker", "Kafka", "AWS"]"#),
            questions_ok(),
        ],
        |b| b.visual_check(false).max_topics(2),
        None,
    )
    .await;

    let question_prompt = &run.backend.prompts()[2];
    assert!(question_prompt.contains("Python"));
    assert!(question_prompt.contains("SQL"));
    assert!(!question_prompt.contains("Docker"));
}

// ── Artifact persistence ─────────────────────────────────────────────────

#[tokio::test]
async fn artifacts_land_under_fixed_names() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let doc = Path::new("ignored.pdf");

    let run = run_pipeline(
        vec![
            visual_low(),
            audit_ok(8),
            profile_ok(r#"["Python"]"#),
            questions_ok(),
        ],
        |b| b.output_dir(out.clone()),
        Some(doc),
    )
    .await;
    assert!(run.result.fatal_error.is_none());

    for name in [
        "resume_feedback.txt",
        "cover_letter.txt",
        "interview_questions.txt",
        "interview_solutions.txt",
        "ats_readability_report.txt",
        "ats_visual_check.txt",
    ] {
        let path = out.join(name);
        assert!(path.exists(), "missing artifact {name}");
        assert!(!std::fs::read_to_string(&path).unwrap().is_empty());
    }

    // No leftover temp files from atomic writes.
    let leftovers: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn no_output_dir_means_no_files() {
    let run = run_pipeline(
        vec![audit_ok(7), profile_ok("[]")],
        |b| b.visual_check(false),
        None,
    )
    .await;
    assert!(run.result.fatal_error.is_none());
    // Nothing to assert on disk; the run simply stays in memory.
    assert!(!run.result.questions_doc.is_empty());
}

// ── process_bytes ────────────────────────────────────────────────────────

#[tokio::test]
async fn process_bytes_rejects_non_pdf_payload() {
    let progress = Arc::new(RecordingProgress::default());
    let backend = ScriptedBackend::new(vec![]);
    let config = PipelineConfig::builder()
        .backend(backend.clone())
        .renderer(Arc::new(FixedRenderer))
        .progress_callback(progress.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::new(config).unwrap();

    let r = pipeline.process_bytes(b"this is not a pdf", JD).await;
    assert!(r.is_fatal());
    assert_eq!(backend.calls(), 0);
    assert_eq!(progress.completions(), vec![true]);
}
