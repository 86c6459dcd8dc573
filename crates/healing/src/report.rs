//! Resilience scorecard for pipeline definitions.
//!
//! This is marker-presence inspection of the raw text, not parsing: a
//! pipeline that expresses retries or caching through syntax not listed here
//! is reported as lacking it.

use pipemedic_catalog::FailureSeverity;
use pipemedic_common::Platform;
use serde::{Deserialize, Serialize};

pub const RETRY_PENALTY: i32 = 15;
pub const CACHE_PENALTY: i32 = 10;
pub const TIMEOUT_PENALTY: i32 = 5;

const TIMEOUT_MARKERS: &[&str] = &["timeout"];

const TIMEOUT_RECOMMENDATION: &str =
    "Set explicit timeouts so hung jobs fail fast instead of running to the platform maximum";

/// Resilience gap found in a pipeline definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VulnerabilityKind {
    MissingRetry,
    MissingCache,
    MissingTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(rename = "type")]
    pub kind: VulnerabilityKind,
    pub description: String,
    pub severity: FailureSeverity,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfHealingReport {
    pub vulnerabilities: Vec<Vulnerability>,
    pub recommendations: Vec<String>,
    /// 0-100.
    pub self_healing_score: u8,
}

struct PlatformChecks {
    retry_markers: &'static [&'static str],
    retry_recommendation: &'static str,
    cache_markers: &'static [&'static str],
    cache_recommendation: &'static str,
}

fn checks_for(platform: &Platform) -> Option<PlatformChecks> {
    let checks = match platform {
        Platform::Github => PlatformChecks {
            retry_markers: &["continue-on-error", "nick-fields/retry", "retry-on", "max_attempts"],
            retry_recommendation: "Wrap flaky steps in a retry action such as nick-fields/retry, or mark non-critical steps with continue-on-error",
            cache_markers: &["actions/cache", "cache:"],
            cache_recommendation: "Cache dependencies with actions/cache or the setup action's cache input",
        },
        Platform::Gitlab => PlatformChecks {
            retry_markers: &["retry:"],
            retry_recommendation: "Add a retry: policy to jobs that depend on the network or shared runners",
            cache_markers: &["cache:"],
            cache_recommendation: "Define cache: keyed on the dependency lockfile",
        },
        Platform::CircleCi => PlatformChecks {
            retry_markers: &["max_auto_reruns", "retry"],
            retry_recommendation: "Enable automatic reruns with max_auto_reruns or wrap flaky commands in a retry loop",
            cache_markers: &["save_cache", "restore_cache"],
            cache_recommendation: "Use save_cache and restore_cache keyed on the lockfile checksum",
        },
        Platform::Aws => PlatformChecks {
            retry_markers: &["retry-limit", "on-failure: retry", "retrymode"],
            retry_recommendation: "Configure a retry limit on the CodeBuild project or an adaptive SDK retry mode",
            cache_markers: &["cache:", "localcache", "s3cache"],
            cache_recommendation: "Enable buildspec cache paths backed by S3 or local caching",
        },
        Platform::Other(_) => return None,
    };
    Some(checks)
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| haystack.contains(m))
}

/// Score `pipeline` against the resilience checklist for `platform`.
///
/// Markers are matched case-insensitively. Unknown platforms only get the
/// timeout check.
pub fn generate_report(platform: &Platform, pipeline: &str) -> SelfHealingReport {
    let text = pipeline.to_lowercase();
    let mut score: i32 = 100;
    let mut vulnerabilities = Vec::new();

    if let Some(checks) = checks_for(platform) {
        if !contains_any(&text, checks.retry_markers) {
            score -= RETRY_PENALTY;
            vulnerabilities.push(Vulnerability {
                kind: VulnerabilityKind::MissingRetry,
                description: format!("No retry mechanism found for {} jobs", platform),
                severity: FailureSeverity::Medium,
                recommendation: checks.retry_recommendation.to_string(),
            });
        }

        if !contains_any(&text, checks.cache_markers) {
            score -= CACHE_PENALTY;
            vulnerabilities.push(Vulnerability {
                kind: VulnerabilityKind::MissingCache,
                description: "No dependency caching configured".to_string(),
                severity: FailureSeverity::Low,
                recommendation: checks.cache_recommendation.to_string(),
            });
        }
    }

    if !contains_any(&text, TIMEOUT_MARKERS) {
        score -= TIMEOUT_PENALTY;
        vulnerabilities.push(Vulnerability {
            kind: VulnerabilityKind::MissingTimeout,
            description: "No timeout configured".to_string(),
            severity: FailureSeverity::Low,
            recommendation: TIMEOUT_RECOMMENDATION.to_string(),
        });
    }

    let mut recommendations: Vec<String> = vulnerabilities
        .iter()
        .map(|v| v.recommendation.clone())
        .collect();
    if recommendations.is_empty() {
        recommendations.push("No resilience gaps found by the checklist".to_string());
    }

    SelfHealingReport {
        vulnerabilities,
        recommendations,
        self_healing_score: score.clamp(0, 100) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(report: &SelfHealingReport) -> Vec<VulnerabilityKind> {
        report.vulnerabilities.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_empty_github_pipeline() {
        let report = generate_report(&Platform::Github, "");
        assert_eq!(report.self_healing_score, 70);
        assert_eq!(
            kinds(&report),
            vec![
                VulnerabilityKind::MissingRetry,
                VulnerabilityKind::MissingCache,
                VulnerabilityKind::MissingTimeout,
            ]
        );
        assert_eq!(report.recommendations.len(), 3);
    }

    #[test]
    fn test_resilient_github_workflow() {
        let workflow = r#"
jobs:
  test:
    runs-on: ubuntu-latest
    timeout-minutes: 15
    steps:
      - uses: actions/setup-node@v4
        with:
          cache: npm
      - uses: nick-fields/retry@v3
        with:
          max_attempts: 3
          command: npm test
"#;
        let report = generate_report(&Platform::Github, workflow);
        assert_eq!(report.self_healing_score, 100);
        assert!(report.vulnerabilities.is_empty());
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_gitlab_retry_key() {
        let pipeline = "test:\n  script: make test\n  retry: 2\n";
        let report = generate_report(&Platform::Gitlab, pipeline);
        assert_eq!(
            kinds(&report),
            vec![VulnerabilityKind::MissingCache, VulnerabilityKind::MissingTimeout]
        );
        assert_eq!(report.self_healing_score, 85);
    }

    #[test]
    fn test_circleci_cache_and_timeout() {
        let config = "steps:\n  - restore_cache:\n      keys: [deps]\n  - run:\n      command: make\n      no_output_timeout: 20m\n";
        let report = generate_report(&Platform::CircleCi, config);
        assert_eq!(kinds(&report), vec![VulnerabilityKind::MissingRetry]);
        assert_eq!(report.self_healing_score, 85);
    }

    #[test]
    fn test_aws_markers_are_case_insensitive() {
        let buildspec = "version: 0.2\nphases:\n  build:\n    on-failure: RETRY\ncache:\n  paths: ['/root/.npm/**/*']\n";
        let report = generate_report(&Platform::Aws, buildspec);
        assert_eq!(kinds(&report), vec![VulnerabilityKind::MissingTimeout]);
        assert_eq!(report.self_healing_score, 95);
    }

    #[test]
    fn test_unknown_platform_only_checks_timeout() {
        let report = generate_report(&Platform::from("jenkins"), "");
        assert_eq!(kinds(&report), vec![VulnerabilityKind::MissingTimeout]);
        assert_eq!(report.self_healing_score, 95);
    }

    #[test]
    fn test_score_stays_in_range() {
        for platform in ["github", "gitlab", "circleci", "aws", "other"] {
            let report = generate_report(&Platform::from(platform), "steps: []");
            assert!(report.self_healing_score <= 100);
            assert!(report.self_healing_score >= 70);
        }
    }

    #[test]
    fn test_vulnerability_serializes_type_field() {
        let report = generate_report(&Platform::Github, "");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["vulnerabilities"][0]["type"], "missing_retry");
        assert_eq!(json["self_healing_score"], 70);
    }
}
