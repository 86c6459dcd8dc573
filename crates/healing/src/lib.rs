//! Self-healing layer for pipemedic.
//!
//! Wraps the failure analyzer with history recording, fix script execution,
//! a retry policy and the pipeline resilience scorecard.

pub mod executor;
pub mod history;
pub mod manager;
pub mod options;
pub mod redact;
pub mod report;
pub mod retry;

pub use executor::{LocalScriptRunner, ScriptOutput, ScriptRunner};
pub use history::{FileHistoryStore, HistoryRecord, HistoryStore};
pub use manager::{AnalysisResult, FixResult, HealOutcome, SelfHealingManager};
pub use options::SelfHealingOptions;
pub use report::{generate_report, SelfHealingReport, Vulnerability, VulnerabilityKind};
pub use retry::RetryDecision;
