//! Prompt construction for every pipeline stage.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tightening a stage's response contract
//!    requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompt text directly without
//!    a live model, so contract regressions (a dropped field name, a lost
//!    constraint) are caught cheaply.
//!
//! Cross-stage influence is expressed as typed values, never as magic
//! marker strings: the visual check hands the audit stage an
//! [`AtsConstraint`], and topic→category steering goes through
//! [`classify_topic`], both testable without any prompt text at all.

use crate::config::RedactionAuditPolicy;
use crate::output::ExperienceLevel;

// ── Cross-stage constraint (visual check → ATS audit) ────────────────────

/// Fixed diagnostic appended to the audit's critical-issues list when the
/// visual check found a layout/extraction mismatch.
pub const VISUAL_MISMATCH_DIAGNOSTIC: &str =
    "Visual layout does not match the extracted text; ATS parsers will likely misread this résumé.";

/// A typed constraint injected into the ATS-audit stage.
///
/// Produced by the orchestrator when the visual check reports HIGH risk.
/// The constraint is applied twice on purpose: worded into the audit prompt
/// *and* enforced on the parsed result, because the visual check has ground
/// truth (the rendered page) that the text-only audit lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtsConstraint {
    /// Ceiling for the audit's numeric score.
    pub max_score: u8,
    /// Diagnostic string that must appear in the critical-issues list.
    pub diagnostic: &'static str,
}

impl AtsConstraint {
    /// The constraint corresponding to a HIGH visual-mismatch risk.
    pub fn visual_mismatch() -> Self {
        Self {
            max_score: 5,
            diagnostic: VISUAL_MISMATCH_DIAGNOSTIC,
        }
    }
}

// ── Topic classification (declarative, model-independent) ────────────────

/// Coarse kind of a technical topic, steering the question category
/// requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// Programming language or query language → coding exercise.
    Language,
    /// Infrastructure/tooling → scenario question.
    Tool,
    /// Anything else → theory question.
    Concept,
}

impl TopicKind {
    /// The question category label requested in the prompt.
    pub fn category_label(&self) -> &'static str {
        match self {
            TopicKind::Language => "coding",
            TopicKind::Tool => "scenario",
            TopicKind::Concept => "theory",
        }
    }
}

const LANGUAGES: &[&str] = &[
    "python", "sql", "java", "javascript", "typescript", "rust", "go", "golang", "c", "c++",
    "c#", "ruby", "php", "kotlin", "swift", "scala", "r", "bash",
];

const TOOLS: &[&str] = &[
    "docker", "kubernetes", "git", "aws", "gcp", "azure", "terraform", "jenkins", "kafka",
    "redis", "postgresql", "mysql", "mongodb", "elasticsearch", "spark", "airflow", "linux",
    "ansible", "grafana", "prometheus",
];

/// Classify a topic keyword into a [`TopicKind`].
///
/// Deterministic and case-insensitive. The model is never trusted to do
/// this branching on its own.
pub fn classify_topic(topic: &str) -> TopicKind {
    let t = topic.trim().to_lowercase();
    if LANGUAGES.contains(&t.as_str()) {
        TopicKind::Language
    } else if TOOLS.contains(&t.as_str()) {
        TopicKind::Tool
    } else {
        TopicKind::Concept
    }
}

// ── Stage prompts ────────────────────────────────────────────────────────

/// Prompt for the visual-consistency check (sent with the page image).
pub fn visual_check_prompt(text_prefix: &str) -> String {
    format!(
        r#"You are auditing a résumé for layout-extraction mismatch.

Attached is the rendered first page of the résumé. Below is the text a parser extracted from the same document:

"""
{text_prefix}
"""

Compare what you SEE on the page with the extracted text. Classify the risk that automated parsers misread this résumé (multi-column layouts, tables, graphics, text baked into images all raise risk).

Respond with ONLY a JSON object:
{{"risk": "HIGH" or "LOW", "issue_detected": "<one-sentence description of the worst mismatch, or 'none'>", "advice": "<one concrete fix the candidate should apply>"}}"#
    )
}

/// Prompt for the ATS-readability audit.
///
/// `constraint` is present when the visual check reported HIGH risk;
/// `policy` resolves how redaction placeholders are scored (an explicit
/// configuration choice, not a hidden prompt instruction).
pub fn ats_audit_prompt(
    resume_text: &str,
    constraint: Option<&AtsConstraint>,
    policy: RedactionAuditPolicy,
) -> String {
    let mut prompt = format!(
        r#"Act as an Applicant Tracking System simulator.

Résumé text as extracted by a parser:
"""
{resume_text}
"""

Audit how reliably ATS software would read this résumé: section headings, contact details, dates, bullet structure, keyword visibility.

Respond with ONLY a JSON object:
{{"score": <integer 0-10>, "critical_issues": ["<issue>", ...], "report": "<short plain-text report>"}}"#
    );

    match policy {
        RedactionAuditPolicy::TreatPlaceholdersAsValid => {
            prompt.push_str(
                "\n\nTokens like [EMAIL REDACTED] and [PHONE REDACTED] are privacy placeholders; treat them as perfectly valid contact information.",
            );
        }
        RedactionAuditPolicy::PenalizeRedacted => {
            prompt.push_str(
                "\n\nTokens like [EMAIL REDACTED] and [PHONE REDACTED] are privacy placeholders; score contact-detail readability as if those details were missing.",
            );
        }
    }

    if let Some(c) = constraint {
        prompt.push_str(&format!(
            "\n\nA visual inspection of the rendered page found a layout-extraction mismatch. Your score MUST NOT exceed {} and your critical_issues MUST include: \"{}\"",
            c.max_score, c.diagnostic
        ));
    }

    prompt
}

/// Prompt for the batched profile-analysis stage.
///
/// One call produces feedback, the cover letter, the topic set, and the
/// experience level — batching keeps the run at a fixed, small number of
/// backend calls.
pub fn profile_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"Act as an expert technical career coach.

Candidate résumé:
"""
{resume_text}
"""

Target job description:
"""
{job_description}
"""

Produce ALL of the following in one response:

1. "feedback": concrete suggestions to tailor this résumé to this job (array of short strings is fine).
2. "cover_letter": a complete, concise cover letter for this application. Use the candidate's real name and contact details from the résumé — never placeholders like [Your Name].
3. "topics": up to 3 technical keywords from the JOB DESCRIPTION that matter most for interviews (e.g. "Python", "SQL"). Empty array if the description names no technologies.
4. "experience_level": the seniority this JOB DESCRIPTION targets (judge the description, not the résumé) — exactly one of "Entry-Level/Student", "Junior", "Mid-Level", "Senior".

Respond with ONLY a JSON object with those four keys."#
    )
}

/// One topic plus its requested question category, as fed to the
/// question-generation prompt.
#[derive(Debug, Clone)]
pub struct TopicSpec {
    pub topic: String,
    pub kind: TopicKind,
}

impl TopicSpec {
    pub fn new(topic: impl Into<String>) -> Self {
        let topic = topic.into();
        let kind = classify_topic(&topic);
        Self { topic, kind }
    }
}

/// Prompt for the interview-question generation stage.
pub fn question_generation_prompt(
    topics: &[TopicSpec],
    level: ExperienceLevel,
    questions_per_topic: usize,
    reference_material: Option<&str>,
) -> String {
    let topic_lines: Vec<String> = topics
        .iter()
        .map(|t| format!("- {} (ask a {} question)", t.topic, t.kind.category_label()))
        .collect();

    let mut prompt = format!(
        r#"Generate interview-preparation questions for a candidate targeting a {level} role.

Topics and required question category:
{}

For EACH topic produce {questions_per_topic} question(s).

Respond with ONLY a JSON array of objects:
[{{"topic": "<topic>", "category": "theory"|"coding"|"scenario", "is_real": <true if taken from the reference material below, else false>, "question": "<full problem statement with example input/output where relevant>", "starter_code": "<optional starter snippet or null>", "solution": "<model answer or working solution>", "complexity": "<optional time/space complexity or null>", "source_url": "<URL of the real source or null>"}}]"#,
        topic_lines.join("\n")
    );

    match reference_material {
        Some(material) => prompt.push_str(&format!(
            "\n\nReference material gathered from the web (prefer adapting REAL questions from it and set is_real=true with the source_url):\n\"\"\"\n{material}\n\"\"\""
        )),
        None => prompt.push_str(
            "\n\nNo reference material is available; generate original questions and set is_real=false with source_url null.",
        ),
    }

    prompt
}
