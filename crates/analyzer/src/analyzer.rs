//! Log classification against the catalog.

use crate::confidence::calculate_confidence;
use crate::types::{DetectedFailure, FixSuggestion};
use pipemedic_catalog::{Catalog, FailureSeverity, FailureType};
use pipemedic_common::Platform;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

/// Characters searched on each side of a match for a source location.
pub const LOCATION_WINDOW: usize = 200;

/// Longest message kept for a synthesized unknown failure.
const UNKNOWN_MESSAGE_MAX: usize = 200;

/// `path:line[:column]`, where the path ends in a file extension.
static LOCATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_./\\-]+\.[A-Za-z][A-Za-z0-9]{0,9}:\d+(?::\d+)?").unwrap()
});

/// Classifies failure logs for one platform.
///
/// Holds no per-call state; clones share the catalog.
#[derive(Debug, Clone)]
pub struct FailureAnalyzer {
    catalog: Arc<Catalog>,
    platform: Platform,
}

impl FailureAnalyzer {
    pub fn new(catalog: Arc<Catalog>, platform: Platform) -> Self {
        Self { catalog, platform }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Detect failures in `log`, most severe first.
    ///
    /// Each matcher contributes at most one failure (its leftmost match).
    /// The result is never empty: when nothing matches, a single
    /// `Unknown`/`Medium` failure is returned.
    pub fn analyze_failure(&self, log: &str) -> Vec<DetectedFailure> {
        let mut failures = Vec::new();

        for pattern in self.catalog.lookup_patterns(&self.platform) {
            for matcher in &pattern.matchers {
                let Some(mat) = matcher.find(log) else {
                    continue;
                };

                trace!("Matcher fired: {} at {}", matcher.as_str(), mat.start());

                failures.push(DetectedFailure {
                    failure_type: pattern.failure_type,
                    severity: pattern.severity,
                    message: mat.as_str().to_string(),
                    matched_pattern: matcher.as_str().to_string(),
                    description: pattern.description.clone(),
                    location: extract_location(log, mat.start()),
                });
            }
        }

        if failures.is_empty() {
            failures.push(unknown_failure(log));
        }

        // stable: ties keep rule evaluation order
        failures.sort_by_key(|f| f.severity.rank());

        debug!(
            "Analyzed {} bytes of log for {}: {} failures",
            log.len(),
            self.platform,
            failures.len()
        );

        failures
    }

    /// One suggestion per failure, in input order.
    pub fn suggest_fixes(&self, failures: &[DetectedFailure]) -> Vec<FixSuggestion> {
        failures
            .iter()
            .map(|failure| {
                let fixes = self
                    .catalog
                    .lookup_fixes(failure.failure_type, &self.platform);
                let confidence = calculate_confidence(failure, &fixes);
                let auto_fix_possible = fixes.iter().any(|f| f.has_script());

                FixSuggestion {
                    failure: failure.clone(),
                    fixes: fixes.into_iter().cloned().collect(),
                    auto_fix_possible,
                    confidence,
                }
            })
            .collect()
    }
}

/// Find a `path:line[:column]` token within [`LOCATION_WINDOW`] characters
/// of the byte `offset`.
pub fn extract_location(log: &str, offset: usize) -> Option<String> {
    let offset = floor_char_boundary(log, offset);
    let start = log[..offset]
        .char_indices()
        .rev()
        .nth(LOCATION_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    let end = log[offset..]
        .char_indices()
        .nth(LOCATION_WINDOW)
        .map_or(log.len(), |(i, _)| offset + i);

    LOCATION_PATTERN
        .find(&log[start..end])
        .map(|m| m.as_str().to_string())
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn unknown_failure(log: &str) -> DetectedFailure {
    let message = log
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.chars().take(UNKNOWN_MESSAGE_MAX).collect())
        .unwrap_or_else(|| "No failure pattern matched the log".to_string());

    DetectedFailure {
        failure_type: FailureType::Unknown,
        severity: FailureSeverity::Medium,
        message,
        matched_pattern: String::new(),
        description: "Unrecognized failure".to_string(),
        location: None,
    }
}
