//! Pipemedic Analyzer - classify CI failure logs and suggest fixes.

pub mod analyzer;
pub mod confidence;
pub mod types;

pub use analyzer::FailureAnalyzer;
pub use types::{AnalysisSummary, DetectedFailure, FixSuggestion};
