//! Redaction of personally identifiable information from free text.
//!
//! Patterns run in a fixed order over the progressively rewritten string.
//! The SSN and card shapes are narrower than the phone shape and must run
//! first, otherwise the phone pattern would eat part of their digits.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub const REDACTED_SSN: &str = "[REDACTED-SSN]";
pub const REDACTED_CARD: &str = "[REDACTED-CARD]";
pub const REDACTED_PHONE: &str = "[REDACTED-PHONE]";
pub const REDACTED_EMAIL: &str = "[REDACTED-EMAIL]";

static RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\d{3}-\d{2}-\d{4}", REDACTED_SSN),
        (r"\d{3} \d{2} \d{4}", REDACTED_SSN),
        (r"\b\d{16}\b", REDACTED_CARD),
        (r"\b\d{4}[- ]\d{4}[- ]\d{4}[- ]\d{4}\b", REDACTED_CARD),
        (
            r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b",
            REDACTED_PHONE,
        ),
        (
            r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
            REDACTED_EMAIL,
        ),
    ]
    .into_iter()
    .map(|(pattern, token)| (Regex::new(pattern).expect("PII pattern is a valid regex"), token))
    .collect()
});

/// Replace every SSN, card number, phone number and email address in `input`.
/// Borrows when nothing matched.
pub fn scrub_pii(input: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(input);
    if input.is_empty() {
        return out;
    }

    for (pattern, token) in RULES.iter() {
        let replaced = match pattern.replace_all(&out, *token) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        if let Some(s) = replaced {
            out = Cow::Owned(s);
        }
    }

    out
}

/// Scrub a JSON value. Anything that is not a non-empty string is returned as is.
pub fn scrub_value(value: Value) -> Value {
    match value {
        Value::String(s) if !s.is_empty() => match scrub_pii(&s) {
            Cow::Borrowed(_) => Value::String(s),
            Cow::Owned(scrubbed) => Value::String(scrubbed),
        },
        other => other,
    }
}
