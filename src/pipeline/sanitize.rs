//! PII redaction: produce an email/phone-free view of the résumé text.
//!
//! The sanitized view exists for one reason: the ATS-audit stage's prompt
//! (and its persisted report) should not carry raw contact data when
//! redaction is enabled for the run. The canonical résumé text is never
//! mutated — the cover-letter stage needs the real contact details and
//! always receives the original.
//!
//! Pure function: same input, same output, no external state. Redaction is
//! idempotent because the placeholders contain no `@` and no digits, so
//! they can never re-match either pattern.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder substituted for every email-shaped match.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL REDACTED]";
/// Placeholder substituted for every phone-shaped match.
pub const PHONE_PLACEHOLDER: &str = "[PHONE REDACTED]";

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

// Covers the usual separator conventions: 555-123-4567, (555) 123 4567,
// +1 555.123.4567. Requires the full 3-3-4 digit shape so years and ZIP
// codes are left alone.
static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\d{3})[\s.-]?\d{3}[\s.-]?\d{4}").unwrap()
});

/// What kind of PII a redaction replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RedactionKind {
    Email,
    Phone,
}

impl RedactionKind {
    /// The fixed placeholder token this kind is replaced with.
    pub fn placeholder(&self) -> &'static str {
        match self {
            RedactionKind::Email => EMAIL_PLACEHOLDER,
            RedactionKind::Phone => PHONE_PLACEHOLDER,
        }
    }
}

/// A PII-redacted derivative of the résumé text.
///
/// Derived once per run and never mutated. Consumed only by stages that
/// must not see raw contact data.
#[derive(Debug, Clone)]
pub struct SanitizedText {
    /// The text with every email/phone match replaced by its placeholder.
    pub redacted: String,
    /// How many substitutions were made, per kind.
    pub redactions: Vec<(RedactionKind, usize)>,
}

impl SanitizedText {
    /// Total number of substitutions across all kinds.
    pub fn redaction_count(&self) -> usize {
        self.redactions.iter().map(|(_, n)| n).sum()
    }
}

/// Replace every email- and phone-shaped substring with a fixed placeholder,
/// leaving all other characters unchanged.
pub fn sanitize(text: &str) -> SanitizedText {
    let email_hits = RE_EMAIL.find_iter(text).count();
    let step = RE_EMAIL.replace_all(text, EMAIL_PLACEHOLDER);

    let phone_hits = RE_PHONE.find_iter(&step).count();
    let redacted = RE_PHONE.replace_all(&step, PHONE_PLACEHOLDER).into_owned();

    let mut redactions = Vec::new();
    if email_hits > 0 {
        redactions.push((RedactionKind::Email, email_hits));
    }
    if phone_hits > 0 {
        redactions.push((RedactionKind::Phone, phone_hits));
    }

    SanitizedText {
        redacted,
        redactions,
    }
}
