//! Structured-response parsing: recover one JSON value from model output.
//!
//! ## Why a two-stage parser?
//!
//! Even when the prompt demands "respond with JSON only", language models
//! routinely wrap the payload in commentary ("Here is the analysis you
//! asked for:") or in fenced code blocks. Historically this was handled
//! with a pile of per-call-site string-replace heuristics; this module
//! replaces all of them with one well-specified procedure:
//!
//! 1. Strip fenced code-block wrapping (```json … ``` or bare fences).
//! 2. Try a direct `serde_json` parse of the trimmed text.
//! 3. Fall back to the outermost balanced `{…}` or `[…]` span (string- and
//!    escape-aware) and parse that span.
//!
//! If all of that fails, [`ParseFailure`] carries a truncated snippet of
//! the raw text for diagnostics. Callers treat it as a stage-level failure,
//! never a process-level one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of characters of raw model output kept for diagnostics.
const SNIPPET_CHARS: usize = 240;

/// No JSON value could be recovered from a model response.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("no JSON value could be recovered from response: {snippet}")]
pub struct ParseFailure {
    /// The raw response, truncated to a bounded length.
    pub snippet: String,
}

impl ParseFailure {
    /// Build a failure whose snippet is `raw` truncated to a bounded length.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            snippet: truncate_chars(raw, SNIPPET_CHARS),
        }
    }
}

/// Extract exactly one JSON value (object or array) from a raw model response.
pub fn extract_json(raw: &str) -> Result<Value, ParseFailure> {
    let unfenced = strip_fences(raw);
    let trimmed = unfenced.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(span) = balanced_span(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    Err(ParseFailure::from_raw(raw))
}

/// Extract a JSON value and deserialize it into `T`.
///
/// Missing fields resolve to their serde defaults; unknown fields are
/// ignored. Deserialisation failure after successful extraction is still a
/// [`ParseFailure`] — the structure was not the one the stage contract asks
/// for, which callers cannot distinguish from no structure at all.
pub fn parse_stage_value<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|_| ParseFailure::from_raw(raw))
}

// ── Fence stripping ──────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_fences(raw: &str) -> &str {
    match RE_OUTER_FENCES.captures(raw.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw,
    }
}

// ── Balanced-span fallback ───────────────────────────────────────────────

/// Find the outermost balanced `{…}` or `[…]` span, starting at the first
/// opener. Brace counting skips over JSON string literals so braces inside
/// quoted text cannot unbalance the scan.
fn balanced_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Truncate on a char boundary, never mid-codepoint.
fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
