//! Retry policy for failed pipeline runs.

use crate::options::SelfHealingOptions;
use pipemedic_analyzer::DetectedFailure;
use pipemedic_catalog::FailureType;
use serde::{Deserialize, Serialize};

/// Whether a failed run should be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RetryDecision {
    Retry { attempt: u32, delay_seconds: u64 },
    GiveUp { reason: String },
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry { .. })
    }
}

/// Failure types that tend to clear on a re-run.
pub fn is_transient(failure_type: FailureType) -> bool {
    matches!(
        failure_type,
        FailureType::Network | FailureType::Timeout | FailureType::Resource
    )
}

/// Decide whether to retry after `attempts` retries have already been made.
pub fn decide(
    options: &SelfHealingOptions,
    failures: &[DetectedFailure],
    attempts: u32,
) -> RetryDecision {
    if !options.auto_retry {
        return RetryDecision::GiveUp {
            reason: "automatic retry is disabled".to_string(),
        };
    }

    if attempts >= options.max_retries {
        return RetryDecision::GiveUp {
            reason: format!("retry limit of {} reached", options.max_retries),
        };
    }

    if !failures.iter().any(|f| is_transient(f.failure_type)) {
        return RetryDecision::GiveUp {
            reason: "no transient failure detected".to_string(),
        };
    }

    RetryDecision::Retry {
        attempt: attempts + 1,
        delay_seconds: options.retry_delay_seconds,
    }
}
