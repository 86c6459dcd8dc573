//! Confidence scoring for fix suggestions.

use crate::types::DetectedFailure;
use pipemedic_catalog::{FailureFix, FailureSeverity, FailureType};

/// Fix count above which the suggestion is considered ambiguous.
pub const MANY_FIXES_THRESHOLD: usize = 3;

const NO_FIX_PENALTY: i32 = 20;
const MANY_FIXES_PENALTY: i32 = 10;
const UNKNOWN_TYPE_PENALTY: i32 = 30;
const PLATFORM_FIX_BONUS: i32 = 10;

/// Starting confidence for a severity.
pub fn severity_base(severity: FailureSeverity) -> i32 {
    match severity {
        FailureSeverity::Critical => 90,
        FailureSeverity::High => 75,
        FailureSeverity::Medium => 60,
        FailureSeverity::Low => 40,
    }
}

/// Confidence (0-100) that `fixes` address `failure`.
///
/// Many candidate fixes lower the score because it is less clear which one
/// applies; a platform-specific fix raises it.
pub fn calculate_confidence(failure: &DetectedFailure, fixes: &[&FailureFix]) -> u8 {
    let mut confidence = severity_base(failure.severity);

    if fixes.is_empty() {
        confidence -= NO_FIX_PENALTY;
    }

    if fixes.len() > MANY_FIXES_THRESHOLD {
        confidence -= MANY_FIXES_PENALTY;
    }

    if failure.failure_type == FailureType::Unknown {
        confidence -= UNKNOWN_TYPE_PENALTY;
    }

    if fixes.iter().any(|f| f.platform_specific) {
        confidence += PLATFORM_FIX_BONUS;
    }

    confidence.clamp(0, 100) as u8
}
