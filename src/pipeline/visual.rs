//! Visual-consistency check: rendered first page vs. extracted text.
//!
//! Text-only auditing cannot see what the résumé actually looks like. This
//! check renders page one, sends the image together with a bounded prefix
//! of the extracted text to a vision-capable model, and asks for a risk
//! classification. It is strictly advisory: any failure along the way —
//! rendering, the model call, parsing — yields `None` and the run carries
//! on without it.

use edgequake_llm::ImageData;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::backend::GenerativeBackend;
use crate::pipeline::extract::PageRenderer;
use crate::pipeline::stage::{run_stage, StageOutcome};
use crate::pipeline::{encode, parse};
use crate::prompts;

/// Layout-extraction mismatch risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualRisk {
    Low,
    High,
    /// The model answered, but not with a recognisable risk label. Treated
    /// like Low for override purposes — only an explicit HIGH escalates.
    Unknown,
}

impl VisualRisk {
    fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("high") {
            VisualRisk::High
        } else if label.eq_ignore_ascii_case("low") {
            VisualRisk::Low
        } else {
            VisualRisk::Unknown
        }
    }
}

/// Result of the image-vs-text consistency check.
#[derive(Debug, Clone)]
pub struct VisualRiskAssessment {
    pub risk: VisualRisk,
    pub issue_detected: String,
    pub advice: String,
}

impl VisualRiskAssessment {
    /// Plain-text report for the `ats_visual_check.txt` artifact.
    pub fn report(&self) -> String {
        format!(
            "Visual consistency check\nRisk: {:?}\nIssue: {}\nAdvice: {}\n",
            self.risk, self.issue_detected, self.advice
        )
    }
}

#[derive(Debug, Deserialize)]
struct VisualResponse {
    #[serde(default)]
    risk: String,
    #[serde(default)]
    issue_detected: String,
    #[serde(default)]
    advice: String,
}

/// Run the visual-consistency check. `None` means the check is absent for
/// this run; the caller must not treat that as an error.
pub async fn assess(
    renderer: &dyn PageRenderer,
    backend: &dyn GenerativeBackend,
    document: &Path,
    extracted_text: &str,
    prefix_chars: usize,
    timeout_secs: u64,
) -> Option<VisualRiskAssessment> {
    let image = match renderer.render_first_page(document).await {
        Ok(img) => img,
        Err(e) => {
            warn!("visual check skipped: {e}");
            return None;
        }
    };

    let image_data: ImageData = match encode::encode_page(&image) {
        Ok(data) => data,
        Err(e) => {
            warn!("visual check skipped: image encoding failed: {e}");
            return None;
        }
    };

    let prefix = bounded_prefix(extracted_text, prefix_chars);
    let prompt = prompts::visual_check_prompt(prefix);

    let outcome: StageOutcome<VisualResponse> = run_stage(
        "visual_check",
        backend,
        prompt,
        Some(image_data),
        timeout_secs,
        parse::parse_stage_value,
    )
    .await;

    let response = outcome.value?;
    Some(VisualRiskAssessment {
        risk: VisualRisk::from_label(&response.risk),
        issue_detected: response.issue_detected,
        advice: response.advice,
    })
}

/// Char-boundary-safe prefix of at most `max_chars` characters.
fn bounded_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_label_parsing() {
        assert_eq!(VisualRisk::from_label("HIGH"), VisualRisk::High);
        assert_eq!(VisualRisk::from_label("high"), VisualRisk::High);
        assert_eq!(VisualRisk::from_label("Low"), VisualRisk::Low);
        assert_eq!(VisualRisk::from_label("medium"), VisualRisk::Unknown);
        assert_eq!(VisualRisk::from_label(""), VisualRisk::Unknown);
    }

    #[test]
    fn bounded_prefix_respects_char_boundaries() {
        let text = "résumé ".repeat(300);
        let prefix = bounded_prefix(&text, 1500);
        assert_eq!(prefix.chars().count(), 1500);
        assert!(text.starts_with(prefix));
    }

    #[test]
    fn bounded_prefix_short_text_passthrough() {
        assert_eq!(bounded_prefix("short", 1500), "short");
    }

    #[test]
    fn report_includes_issue_and_advice() {
        let a = VisualRiskAssessment {
            risk: VisualRisk::High,
            issue_detected: "two-column layout".into(),
            advice: "use a single column".into(),
        };
        let r = a.report();
        assert!(r.contains("two-column layout"));
        assert!(r.contains("single column"));
    }
}
