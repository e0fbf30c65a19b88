//! Output types: the aggregated run result, artifact persistence, and the
//! plain-text rendering of the interview-prep documents.

use crate::error::TailorError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ── Fixed artifact names ─────────────────────────────────────────────────

pub const FEEDBACK_FILE: &str = "resume_feedback.txt";
pub const COVER_LETTER_FILE: &str = "cover_letter.txt";
pub const QUESTIONS_FILE: &str = "interview_questions.txt";
pub const SOLUTIONS_FILE: &str = "interview_solutions.txt";
pub const ATS_REPORT_FILE: &str = "ats_readability_report.txt";
pub const VISUAL_CHECK_FILE: &str = "ats_visual_check.txt";

// ── Experience level ─────────────────────────────────────────────────────

/// Target seniority bucket inferred from the job description (never from
/// the résumé). Defaults to Entry-Level/Student when inference fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ExperienceLevel {
    #[default]
    EntryLevel,
    Junior,
    MidLevel,
    Senior,
}

impl ExperienceLevel {
    /// Lenient parse of a model-supplied label. Unrecognised values map to
    /// the default rather than failing the stage.
    pub fn from_label(label: &str) -> Self {
        let l = label.to_lowercase();
        if l.contains("senior") {
            ExperienceLevel::Senior
        } else if l.contains("mid") {
            ExperienceLevel::MidLevel
        } else if l.contains("junior") {
            ExperienceLevel::Junior
        } else {
            ExperienceLevel::EntryLevel
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExperienceLevel::EntryLevel => "Entry-Level/Student",
            ExperienceLevel::Junior => "Junior",
            ExperienceLevel::MidLevel => "Mid-Level",
            ExperienceLevel::Senior => "Senior",
        };
        f.write_str(s)
    }
}

impl<'de> Deserialize<'de> for ExperienceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(ExperienceLevel::from_label(&label))
    }
}

// ── Interview questions ──────────────────────────────────────────────────

/// Category of an interview question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    #[default]
    Theory,
    Coding,
    Scenario,
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionCategory::Theory => "theory",
            QuestionCategory::Coding => "coding",
            QuestionCategory::Scenario => "scenario",
        };
        f.write_str(s)
    }
}

impl<'de> Deserialize<'de> for QuestionCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(match label.to_lowercase().as_str() {
            "coding" => QuestionCategory::Coding,
            "scenario" => QuestionCategory::Scenario,
            _ => QuestionCategory::Theory,
        })
    }
}

/// One interview-preparation entry, produced in batches by the
/// question-generation stage. Immutable once produced.
///
/// `is_real` is model-declared and advisory only: the orchestrator never
/// verifies it, and `is_real: true` does not imply `source_url` resolves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionItem {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub category: QuestionCategory,
    #[serde(default)]
    pub is_real: bool,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub starter_code: Option<String>,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

// ── Visual warning ───────────────────────────────────────────────────────

/// Human-readable issue/advice pair surfaced when the visual check found a
/// HIGH layout-extraction mismatch risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualWarning {
    pub issue: String,
    pub advice: String,
}

// ── Run statistics ───────────────────────────────────────────────────────

/// Timing and call-count statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub visual_check_ms: u64,
    pub ats_audit_ms: u64,
    pub profile_analysis_ms: u64,
    pub question_generation_ms: u64,
    pub total_ms: u64,
    /// Model-backend invocations actually made during the run.
    pub backend_calls: u32,
}

// ── Aggregated result ────────────────────────────────────────────────────

/// Aggregated output of a whole pipeline run.
///
/// Assembled incrementally by the orchestrator; read-only once returned.
/// Absent optional results are represented as empty/default values, never
/// as errors. `fatal_error` is present only when the run aborted at START
/// or at the required profile-analysis stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// ATS readability score, 0–10. 0 when the audit was skipped or failed.
    pub ats_score: u8,
    /// Plain-text ATS report. Empty when the audit was skipped or failed.
    pub ats_report: String,
    /// Present only when the visual check found HIGH risk.
    pub visual_warning: Option<VisualWarning>,
    /// Tailoring feedback. Bulleted lists are joined into one string.
    pub feedback: String,
    /// Draft cover letter with the candidate's real contact details.
    pub cover_letter: String,
    /// Seniority the question set targets.
    pub experience_level: ExperienceLevel,
    /// Generated interview questions. Empty is a valid outcome.
    pub questions: Vec<QuestionItem>,
    /// Rendered interview-prep document (always present, may hold no entries).
    pub questions_doc: String,
    /// Rendered solutions document (always present, may hold no entries).
    pub solutions_doc: String,
    /// Fatal-error message; when set, content fields are unreliable except
    /// for already-completed optional-stage artifacts.
    pub fatal_error: Option<String>,
    pub stats: RunStats,
}

impl RunResult {
    /// A result for a run that aborted before producing anything.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            fatal_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_error.is_some()
    }
}

// ── Document rendering ───────────────────────────────────────────────────

/// Join model feedback expressed as bullet strings into one string with a
/// uniform bullet prefix. A single string passes through unchanged.
pub fn join_feedback(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("- {}", l.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the interview-prep document (questions only, no solutions).
pub fn render_questions_doc(questions: &[QuestionItem], level: ExperienceLevel) -> String {
    let mut doc = format!("INTERVIEW PREP — target level: {level}\n");
    if questions.is_empty() {
        doc.push_str("\nNo technical topics were identified in the job description, so no questions were generated.\n");
        return doc;
    }
    for (i, q) in questions.iter().enumerate() {
        doc.push_str(&format!(
            "\nQ{} [{} — {}{}]\n{}\n",
            i + 1,
            q.topic,
            q.category,
            if q.is_real { ", sourced" } else { "" },
            q.question.trim()
        ));
        if let Some(code) = q.starter_code.as_deref().filter(|c| !c.trim().is_empty()) {
            doc.push_str(&format!("\nStarter code:\n{}\n", code.trim_end()));
        }
        if let Some(url) = q.source_url.as_deref().filter(|u| !u.is_empty()) {
            doc.push_str(&format!("Source: {url}\n"));
        }
    }
    doc
}

/// Render the solutions document matching [`render_questions_doc`] numbering.
pub fn render_solutions_doc(questions: &[QuestionItem]) -> String {
    let mut doc = String::from("INTERVIEW PREP — SOLUTIONS\n");
    if questions.is_empty() {
        doc.push_str("\nNo questions were generated for this run.\n");
        return doc;
    }
    for (i, q) in questions.iter().enumerate() {
        doc.push_str(&format!("\nQ{} [{}]\n{}\n", i + 1, q.topic, q.solution.trim()));
        if let Some(c) = q.complexity.as_deref().filter(|c| !c.is_empty()) {
            doc.push_str(&format!("Complexity: {c}\n"));
        }
    }
    doc
}

// ── Artifact sink ────────────────────────────────────────────────────────

/// Filesystem sink for run artifacts.
///
/// The directory is created on demand. Each write is atomic
/// (write-then-rename) so an abandoned run never leaves a half-written
/// artifact readable by a subsequent run.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one artifact atomically, returning its final path.
    pub async fn write(&self, name: &str, content: &str) -> Result<PathBuf, TailorError> {
        let path = self.dir.join(name);

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TailorError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            }
        })?;

        let tmp_path = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp_path, content).await.map_err(|e| {
            TailorError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            }
        })?;

        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            TailorError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            }
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experience_level_lenient_parse() {
        assert_eq!(ExperienceLevel::from_label("Senior"), ExperienceLevel::Senior);
        assert_eq!(ExperienceLevel::from_label("mid-level"), ExperienceLevel::MidLevel);
        assert_eq!(ExperienceLevel::from_label("JUNIOR dev"), ExperienceLevel::Junior);
        assert_eq!(ExperienceLevel::from_label("Entry-Level/Student"), ExperienceLevel::EntryLevel);
        assert_eq!(ExperienceLevel::from_label("principal wizard"), ExperienceLevel::EntryLevel);
    }

    #[test]
    fn question_item_deserialises_with_defaults() {
        let q: QuestionItem = serde_json::from_str(r#"{"topic": "SQL"}"#).unwrap();
        assert_eq!(q.topic, "SQL");
        assert_eq!(q.category, QuestionCategory::Theory);
        assert!(!q.is_real);
        assert!(q.starter_code.is_none());
    }

    #[test]
    fn question_category_lenient() {
        let q: QuestionItem =
            serde_json::from_str(r#"{"category": "CODING", "topic": "Rust"}"#).unwrap();
        assert_eq!(q.category, QuestionCategory::Coding);
        let q: QuestionItem =
            serde_json::from_str(r#"{"category": "brainteaser"}"#).unwrap();
        assert_eq!(q.category, QuestionCategory::Theory);
    }

    #[test]
    fn feedback_join_uses_uniform_bullets() {
        let joined = join_feedback(&["tighten summary ".into(), "quantify impact".into()]);
        assert_eq!(joined, "- tighten summary\n- quantify impact");
    }

    #[test]
    fn empty_question_docs_are_present_but_entry_free() {
        let qdoc = render_questions_doc(&[], ExperienceLevel::EntryLevel);
        let sdoc = render_solutions_doc(&[]);
        assert!(!qdoc.is_empty());
        assert!(!sdoc.is_empty());
        assert!(!qdoc.contains("Q1"));
        assert!(!sdoc.contains("Q1"));
    }

    #[test]
    fn question_doc_numbering_matches_solutions() {
        let qs = vec![
            QuestionItem {
                topic: "Python".into(),
                category: QuestionCategory::Coding,
                question: "Reverse a linked list.".into(),
                starter_code: Some("def reverse(head): ...".into()),
                solution: "Iterate keeping prev pointer.".into(),
                complexity: Some("O(n) time, O(1) space".into()),
                ..Default::default()
            },
            QuestionItem {
                topic: "SQL".into(),
                question: "Find the second-highest salary.".into(),
                solution: "Use OFFSET or a window function.".into(),
                ..Default::default()
            },
        ];
        let qdoc = render_questions_doc(&qs, ExperienceLevel::MidLevel);
        let sdoc = render_solutions_doc(&qs);
        assert!(qdoc.contains("Q1 [Python — coding]"));
        assert!(qdoc.contains("Q2 [SQL — theory]"));
        assert!(qdoc.contains("Starter code:"));
        assert!(!qdoc.contains("second-highest salary.\nUse OFFSET"), "solutions must not leak");
        assert!(sdoc.contains("Q2 [SQL]"));
        assert!(sdoc.contains("O(n) time"));
    }

    #[test]
    fn fatal_result_has_no_content() {
        let r = RunResult::fatal("bad input");
        assert!(r.is_fatal());
        assert!(r.feedback.is_empty());
        assert!(r.questions.is_empty());
        assert_eq!(r.ats_score, 0);
    }

    #[tokio::test]
    async fn artifact_sink_creates_dir_and_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ArtifactSink::new(dir.path().join("out"));
        let path = sink.write(FEEDBACK_FILE, "hello").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!path.with_extension("txt.tmp").exists());
    }
}
