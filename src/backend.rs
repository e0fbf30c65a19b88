//! Language-model backend: the single seam between the pipeline and the LLM.
//!
//! ARCHITECTURAL RULE: no other module constructs chat messages or talks to
//! a provider directly. Every stage funnels through [`GenerativeBackend`],
//! which keeps the calls single-shot and stateless — no conversation state
//! is carried between calls, so every prompt must include all needed
//! context. This is also the seam the integration tests script against.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::error::TailorError;

/// A backend call failed (network, auth, rate limit, content filter).
///
/// Deliberately unstructured: the orchestrator treats every backend
/// failure identically, as a stage-level failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Single-shot text generation, optionally with one attached image.
///
/// Implementations must be `Send + Sync`; the pipeline shares one backend
/// across all stages of a run via `Arc`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Generate a raw text completion for `prompt`. When `image` is given,
    /// the call is a vision request (used only by the visual check).
    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<String, BackendError>;
}

/// The production backend: wraps an [`edgequake_llm::LLMProvider`].
pub struct EdgequakeBackend {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl EdgequakeBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }
}

#[async_trait]
impl GenerativeBackend for EdgequakeBackend {
    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<String, BackendError> {
        let messages = match image {
            Some(img) => vec![ChatMessage::user_with_images(prompt, vec![img])],
            None => vec![ChatMessage::user(prompt)],
        };

        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendError::new(format!("{e}")))?;

        debug!(
            "backend call: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        Ok(response.content)
    }
}

/// Default model when none is configured. Vision-capable, cheap enough to
/// run a full pipeline (4-5 calls) for well under a cent.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Named provider + model** — the caller named a provider (e.g.
///    `"openai"`); [`ProviderFactory::create_llm_provider`] reads the
///    corresponding API key from the environment.
///
/// 2. **Environment pair** (`TAILOR_LLM_PROVIDER` + `TAILOR_MODEL`) — the
///    provider and model were chosen at the execution-environment level
///    (shell profile, CI). Checked before full auto-detection so the model
///    choice is honoured even when multiple API keys are present.
///
/// 3. **OpenAI preference** — when `OPENAI_API_KEY` is set, default to
///    OpenAI rather than whatever `from_env` happens to pick first.
///
/// 4. **Full auto-detection** ([`ProviderFactory::from_env`]) — scan all
///    known API key variables and take the first available provider.
pub fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, TailorError> {
    if let Some(name) = provider_name {
        return create_provider(name, model.unwrap_or(DEFAULT_MODEL));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("TAILOR_LLM_PROVIDER"),
        std::env::var("TAILOR_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", model.unwrap_or(DEFAULT_MODEL));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TailorError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                 Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TailorError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        TailorError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}
