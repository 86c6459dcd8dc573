//! Secret redaction for log excerpts written to history.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

/// Placeholder for redacted values.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

static AUTH_HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Authorization|X-Api-Key|X-Auth-Token|PRIVATE-TOKEN|Circle-Token):\s*(?:Bearer\s+|Basic\s+|token\s+)?\S+").unwrap()
});

static URL_CREDENTIALS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z][a-z0-9+.-]*://)[^\s:/@]+:[^\s/@]+@").unwrap()
});

static AWS_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:AKIA|ABIA|ACCA|ASIA)[A-Z0-9]{16}\b").unwrap());

static FORGE_TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:gh[pousr]_[A-Za-z0-9]{36,}|glpat-[A-Za-z0-9_-]{20,})\b").unwrap()
});

static SECRET_ASSIGNMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Z0-9_]*(?:TOKEN|SECRET|PASSWORD|PASSWD|API_?KEY)[A-Z0-9_]*)\s*([=:])\s*\S+").unwrap()
});

/// Redacted text and the number of replacements made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted {
    pub content: String,
    pub count: usize,
}

/// Replace credentials in `text` with [`REDACTED_PLACEHOLDER`].
pub fn redact_secrets(text: &str) -> Redacted {
    let mut count = 0;
    let mut content = text.to_string();

    // Matches already holding a placeholder were handled by an earlier pass.
    let mut apply = |pattern: &Regex, replacement: &str| {
        content = pattern
            .replace_all(&content, |caps: &Captures| {
                if caps[0].contains(REDACTED_PLACEHOLDER) {
                    return caps[0].to_string();
                }
                count += 1;
                let mut out = String::new();
                caps.expand(replacement, &mut out);
                out
            })
            .into_owned();
    };

    apply(&AUTH_HEADER_PATTERN, "$1: [REDACTED]");
    apply(&URL_CREDENTIALS_PATTERN, "$1[REDACTED]@");
    apply(&AWS_KEY_PATTERN, REDACTED_PLACEHOLDER);
    apply(&FORGE_TOKEN_PATTERN, REDACTED_PLACEHOLDER);
    apply(&SECRET_ASSIGNMENT_PATTERN, "$1$2[REDACTED]");

    trace!("Redacted {} secrets from excerpt", count);
    Redacted { content, count }
}
