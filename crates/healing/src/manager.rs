//! Self-healing manager: analysis with history, fix attempts and scoring.

use crate::executor::{LocalScriptRunner, ScriptRunner};
use crate::history::{AnalysisRecord, FileHistoryStore, FixAttemptRecord, HistoryRecord, HistoryStore};
use crate::options::SelfHealingOptions;
use crate::report::{generate_report, SelfHealingReport};
use crate::retry::{self, RetryDecision};
use pipemedic_analyzer::{AnalysisSummary, DetectedFailure, FailureAnalyzer, FixSuggestion};
use pipemedic_catalog::{Catalog, FailureSeverity};
use pipemedic_common::{Platform, Timestamp};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Failures found in a log and the fixes proposed for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub failures: Vec<DetectedFailure>,
    pub suggestions: Vec<FixSuggestion>,
}

impl AnalysisResult {
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::from_suggestions(&self.suggestions)
    }
}

/// Outcome of a fix attempt. Never an error: failures are described here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResult {
    pub success: bool,
    pub message: String,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl FixResult {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            output: None,
            error: None,
        }
    }
}

/// Everything one `heal` pass decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealOutcome {
    pub analysis: AnalysisResult,
    /// Present only when `auto_fix` is enabled and a scripted fix existed.
    pub fix: Option<FixResult>,
    pub retry: RetryDecision,
}

/// Coordinates analysis, remediation and history for one platform.
pub struct SelfHealingManager {
    options: SelfHealingOptions,
    analyzer: FailureAnalyzer,
    history: Arc<dyn HistoryStore>,
    runner: Arc<dyn ScriptRunner>,
}

impl SelfHealingManager {
    /// Manager writing history under `options.history_dir` and running
    /// scripts with the local shell.
    pub fn new(catalog: Arc<Catalog>, options: SelfHealingOptions) -> Self {
        let analyzer = FailureAnalyzer::new(catalog, options.platform.clone());
        let history = Arc::new(FileHistoryStore::new(options.history_dir.clone()));

        Self {
            options,
            analyzer,
            history,
            runner: Arc::new(LocalScriptRunner::new()),
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ScriptRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn options(&self) -> &SelfHealingOptions {
        &self.options
    }

    pub fn analyzer(&self) -> &FailureAnalyzer {
        &self.analyzer
    }

    /// Classify `log`, propose fixes and record the analysis.
    ///
    /// A history write failure is logged and does not affect the result.
    pub fn analyze_failure(&self, log: &str) -> AnalysisResult {
        let failures = self.analyzer.analyze_failure(log);
        let suggestions = self.analyzer.suggest_fixes(&failures);

        info!(
            "Analyzed {} byte log for {}: {} failure(s)",
            log.len(),
            self.options.platform,
            failures.len()
        );

        if self.options.notify_on_failure {
            self.notify(&failures);
        }

        let record = HistoryRecord::Analysis(AnalysisRecord::new(
            self.options.platform.clone(),
            log,
            self.options.collect_logs,
            &failures,
            &suggestions,
        ));
        self.persist(&record);

        AnalysisResult {
            failures,
            suggestions,
        }
    }

    /// Run the first scripted fix of `suggestion` in `working_dir`.
    ///
    /// Suggestions without a runnable script are rejected before anything
    /// is executed or recorded.
    pub async fn attempt_fix(&self, suggestion: &FixSuggestion, working_dir: &Path) -> FixResult {
        let failure_type = suggestion.failure.failure_type;

        if !suggestion.auto_fix_possible {
            return FixResult::rejected(format!(
                "No automated fix available for {} failure",
                failure_type
            ));
        }
        let Some(fix) = suggestion.scripted_fix() else {
            return FixResult::rejected(format!(
                "No fix for {} failure carries a script",
                failure_type
            ));
        };
        let Some(script) = fix.automated_script.as_deref() else {
            return FixResult::rejected("Selected fix has no script");
        };

        info!("Attempting fix: {}", fix.description);
        let start = Instant::now();
        let outcome = self
            .runner
            .run(script, working_dir, self.options.fix_timeout())
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(out) if out.success() => FixResult {
                success: true,
                message: format!("Applied fix: {}", fix.description),
                output: Some(out.stdout),
                error: None,
            },
            Ok(out) => {
                let status = match out.exit_code {
                    Some(code) => format!("exit status {}", code),
                    None => "terminated by signal".to_string(),
                };
                let stderr = out.stderr.trim();
                FixResult {
                    success: false,
                    message: format!("Fix script failed: {}", fix.description),
                    output: Some(out.stdout),
                    error: Some(if stderr.is_empty() {
                        status
                    } else {
                        format!("{}: {}", status, stderr)
                    }),
                }
            }
            Err(e) => FixResult {
                success: false,
                message: format!("Fix script could not run: {}", fix.description),
                output: None,
                error: Some(e.to_string()),
            },
        };

        if result.success {
            info!("Fix succeeded in {}ms", duration_ms);
        } else {
            warn!(
                "Fix failed after {}ms: {}",
                duration_ms,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }

        let record = HistoryRecord::FixAttempt(FixAttemptRecord {
            timestamp: Timestamp::now(),
            platform: self.options.platform.clone(),
            working_directory: working_dir.to_path_buf(),
            fix_description: fix.description.clone(),
            suggestion: suggestion.clone(),
            success: result.success,
            output: result.output.clone(),
            error: result.error.clone(),
            duration_ms,
        });
        self.persist(&record);

        result
    }

    /// Analyze `log`, apply the first auto-fixable suggestion when
    /// `auto_fix` is enabled, and decide on a retry.
    ///
    /// `attempt` is the number of retries already made for this run.
    pub async fn heal(&self, log: &str, working_dir: &Path, attempt: u32) -> HealOutcome {
        let analysis = self.analyze_failure(log);

        let fix = if self.options.auto_fix {
            match analysis.suggestions.iter().find(|s| s.auto_fix_possible) {
                Some(suggestion) => Some(self.attempt_fix(suggestion, working_dir).await),
                None => {
                    debug!("auto_fix enabled but no suggestion is auto-fixable");
                    None
                }
            }
        } else {
            None
        };

        let retry = self.retry_decision(&analysis.failures, attempt);
        HealOutcome {
            analysis,
            fix,
            retry,
        }
    }

    pub fn retry_decision(&self, failures: &[DetectedFailure], attempt: u32) -> RetryDecision {
        retry::decide(&self.options, failures, attempt)
    }

    pub fn generate_self_healing_report(
        &self,
        platform: &Platform,
        pipeline: &str,
    ) -> SelfHealingReport {
        generate_report(platform, pipeline)
    }

    fn notify(&self, failures: &[DetectedFailure]) {
        let serious: Vec<&DetectedFailure> = failures
            .iter()
            .filter(|f| f.severity.rank() <= FailureSeverity::High.rank())
            .collect();

        if let Some(top) = serious.first() {
            warn!(
                "{} pipeline failure on {}: {} ({}) {}",
                serious.len(),
                self.options.platform,
                top.failure_type,
                top.severity,
                top.message
            );
        }
    }

    fn persist(&self, record: &HistoryRecord) {
        if let Err(e) = self.history.record(record) {
            warn!("Failed to record {} history: {}", record.kind(), e);
        }
    }
}
