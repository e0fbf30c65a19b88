//! Configuration for a tailoring run.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. There is deliberately no module-level client
//! or global state: the backend, the renderer, the output sink, and every
//! timeout are explicit fields handed to the orchestrator at construction,
//! so two concurrent runs can never share derived state.
//!
//! The historical pipeline variants (with/without visual check, with/without
//! web-sourced questions, with/without audit redaction) collapse into one
//! orchestrator configured by the capability flags below.

use crate::backend::GenerativeBackend;
use crate::error::TailorError;
use crate::pipeline::extract::PageRenderer;
use crate::progress::RunProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// How the ATS audit scores redaction placeholders.
///
/// The upstream behaviour told the audit to treat `[EMAIL REDACTED]` as
/// perfectly valid contact info, which partially defeats the audit when
/// sanitisation is on. Rather than hiding that trade-off in prompt text,
/// it is an explicit, tested choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RedactionAuditPolicy {
    /// Placeholders count as valid contact details (historical behaviour).
    #[default]
    TreatPlaceholdersAsValid,
    /// Placeholders are scored as missing contact details.
    PenalizeRedacted,
}

/// Configuration for the tailoring pipeline.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use resume_tailor::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .visual_check(true)
///     .sanitize_for_audit(true)
///     .api_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Pre-constructed model backend. Takes precedence over `provider_name`.
    /// This is how tests inject a scripted backend.
    pub backend: Option<Arc<dyn GenerativeBackend>>,

    /// Pre-constructed page renderer. Defaults to the pdfium renderer.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    /// LLM provider name (e.g. "openai", "anthropic"). If None, the
    /// provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses [`crate::backend::DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.4.
    ///
    /// Low enough for the audit and profile stages to stay grounded in the
    /// actual résumé text, high enough that cover letters do not read as
    /// boilerplate.
    pub temperature: f32,

    /// Maximum tokens per backend call. Default: 4096.
    pub max_tokens: usize,

    /// Per-model-call timeout in seconds. Default: 60.
    ///
    /// A timed-out call is a stage failure, never a run failure.
    pub api_timeout_secs: u64,

    /// Per-web-fetch timeout in seconds. Default: 10.
    pub fetch_timeout_secs: u64,

    // ── Capability set ────────────────────────────────────────────────────
    /// Run the image-vs-text visual consistency check. Default: true.
    pub visual_check: bool,

    /// Source interview questions from real web material. Default: false.
    pub web_search_questions: bool,

    /// Redact emails/phones before the ATS-audit stage sees the résumé.
    /// Default: true. The cover-letter stage always sees the original text.
    pub sanitize_for_audit: bool,

    /// How the audit scores redaction placeholders. Default:
    /// [`RedactionAuditPolicy::TreatPlaceholdersAsValid`].
    pub redaction_policy: RedactionAuditPolicy,

    // ── Tuning ────────────────────────────────────────────────────────────
    /// Maximum topics carried into question generation. Default: 3.
    pub max_topics: usize,

    /// Questions requested per topic. Default: 1.
    pub questions_per_topic: usize,

    /// How many characters of extracted text the visual check compares
    /// against the rendered page. Default: 1500.
    pub visual_text_prefix_chars: usize,

    // ── Output ────────────────────────────────────────────────────────────
    /// Directory for persisted artifacts, created on demand. None keeps
    /// everything in memory only.
    pub output_dir: Option<PathBuf>,

    /// Optional stage-level progress callback.
    pub progress_callback: Option<Arc<dyn RunProgressCallback>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: None,
            renderer: None,
            provider_name: None,
            model: None,
            temperature: 0.4,
            max_tokens: 4096,
            api_timeout_secs: 60,
            fetch_timeout_secs: 10,
            visual_check: true,
            web_search_questions: false,
            sanitize_for_audit: true,
            redaction_policy: RedactionAuditPolicy::default(),
            max_topics: 3,
            questions_per_topic: 1,
            visual_text_prefix_chars: 1500,
            output_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("backend", &self.backend.as_ref().map(|_| "<dyn GenerativeBackend>"))
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn PageRenderer>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("visual_check", &self.visual_check)
            .field("web_search_questions", &self.web_search_questions)
            .field("sanitize_for_audit", &self.sanitize_for_audit)
            .field("redaction_policy", &self.redaction_policy)
            .field("max_topics", &self.max_topics)
            .field("questions_per_topic", &self.questions_per_topic)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn visual_check(mut self, on: bool) -> Self {
        self.config.visual_check = on;
        self
    }

    pub fn web_search_questions(mut self, on: bool) -> Self {
        self.config.web_search_questions = on;
        self
    }

    pub fn sanitize_for_audit(mut self, on: bool) -> Self {
        self.config.sanitize_for_audit = on;
        self
    }

    pub fn redaction_policy(mut self, policy: RedactionAuditPolicy) -> Self {
        self.config.redaction_policy = policy;
        self
    }

    pub fn max_topics(mut self, n: usize) -> Self {
        self.config.max_topics = n.clamp(1, 5);
        self
    }

    pub fn questions_per_topic(mut self, n: usize) -> Self {
        self.config.questions_per_topic = n.clamp(1, 3);
        self
    }

    pub fn visual_text_prefix_chars(mut self, n: usize) -> Self {
        self.config.visual_text_prefix_chars = n.max(100);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RunProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, TailorError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(TailorError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(TailorError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        Ok(self.config)
    }
}
