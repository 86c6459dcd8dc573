//! Analysis output types.

use pipemedic_catalog::{FailureFix, FailureSeverity, FailureType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One failure occurrence found in a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedFailure {
    pub failure_type: FailureType,
    pub severity: FailureSeverity,
    /// The literal text that matched.
    pub message: String,
    /// Source of the matcher that fired.
    pub matched_pattern: String,
    pub description: String,
    /// `path:line[:column]` found near the match, if any.
    pub location: Option<String>,
}

/// Fixes proposed for one detected failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub failure: DetectedFailure,
    pub fixes: Vec<FailureFix>,
    pub auto_fix_possible: bool,
    /// 0-100.
    pub confidence: u8,
}

impl FixSuggestion {
    /// First fix carrying an automated script, in catalog order.
    pub fn scripted_fix(&self) -> Option<&FailureFix> {
        self.fixes.iter().find(|f| f.has_script())
    }
}

/// Aggregate view of an analysis, for logs and human-readable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total: usize,
    pub by_type: BTreeMap<String, usize>,
    pub highest_severity: Option<FailureSeverity>,
    pub auto_fixable: usize,
}

impl AnalysisSummary {
    pub fn from_suggestions(suggestions: &[FixSuggestion]) -> Self {
        let mut summary = AnalysisSummary {
            total: suggestions.len(),
            ..Default::default()
        };

        for suggestion in suggestions {
            let failure = &suggestion.failure;
            *summary
                .by_type
                .entry(failure.failure_type.to_string())
                .or_insert(0) += 1;

            let more_severe = summary
                .highest_severity
                .map_or(true, |s| failure.severity.rank() < s.rank());
            if more_severe {
                summary.highest_severity = Some(failure.severity);
            }

            if suggestion.auto_fix_possible {
                summary.auto_fixable += 1;
            }
        }

        summary
    }
}
