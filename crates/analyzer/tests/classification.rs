use pipemedic_analyzer::confidence::calculate_confidence;
use pipemedic_analyzer::{AnalysisSummary, DetectedFailure, FailureAnalyzer};
use pipemedic_catalog::{Catalog, FailureSeverity, FailureType};
use pipemedic_common::Platform;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

fn analyzer(platform: Platform) -> FailureAnalyzer {
    FailureAnalyzer::new(Arc::new(Catalog::builtin().unwrap()), platform)
}

fn failure(failure_type: FailureType, severity: FailureSeverity) -> DetectedFailure {
    DetectedFailure {
        failure_type,
        severity,
        message: "x".to_string(),
        matched_pattern: "x".to_string(),
        description: "x".to_string(),
        location: None,
    }
}

#[test]
fn jest_failure_has_no_automated_fix() {
    let a = analyzer(Platform::Github);
    let failures = a.analyze_failure("FAIL src/x.test.js ... expect(fn()).toHaveBeenCalledTimes(1)");
    assert_eq!(failures.len(), 1);

    let suggestions = a.suggest_fixes(&failures);
    assert_eq!(suggestions.len(), 1);
    assert!(!suggestions[0].auto_fix_possible);
    assert!((40..=70).contains(&suggestions[0].confidence));
}

#[test]
fn npm_eresolve_is_auto_fixable_dependency_failure() {
    let a = analyzer(Platform::Github);
    let failures = a.analyze_failure(
        "npm ERR! code ERESOLVE\nnpm ERR! ERESOLVE could not resolve dependency tree\nnpm ERR! Found: react@18.2.0",
    );

    let dependency: Vec<_> = failures
        .iter()
        .filter(|f| f.failure_type == FailureType::Dependency)
        .collect();
    assert!(!dependency.is_empty());
    assert!(dependency.iter().all(|f| f.severity == FailureSeverity::High));

    let suggestions = a.suggest_fixes(&failures);
    let suggestion = suggestions
        .iter()
        .find(|s| s.failure.failure_type == FailureType::Dependency)
        .unwrap();
    assert!(suggestion.auto_fix_possible);
    assert!(suggestion.scripted_fix().is_some());
}

#[test]
fn output_is_sorted_most_severe_first() {
    let log = "\
Run npm test
npm ERR! code ETARGET
Error: connect ETIMEDOUT 10.0.0.1:443
write /home/runner/work/app/out.bin: No space left on device
DEPRECATION WARNING: the foo option is deprecated
";
    let failures = analyzer(Platform::Github).analyze_failure(log);
    let ranks: Vec<u8> = failures.iter().map(|f| f.severity.rank()).collect();

    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);
    assert_eq!(failures.first().unwrap().severity, FailureSeverity::Critical);
    assert_eq!(failures.last().unwrap().severity, FailureSeverity::Low);
}

#[test]
fn analysis_is_deterministic() {
    let log = "SyntaxError: Unexpected token '}'\n    at src/app.js:14:3\nECONNRESET";
    let a = analyzer(Platform::Gitlab);
    let first = a.analyze_failure(log);
    let second = a.analyze_failure(log);
    assert_eq!(first, second);
    assert_eq!(a.suggest_fixes(&first), a.suggest_fixes(&second));
}

#[test]
fn unknown_platform_uses_common_rules_only() {
    let a = analyzer(Platform::from("jenkins"));
    let failures = a.analyze_failure("ERROR: Job failed: execution took longer than 1h0m0s seconds");
    assert_eq!(failures[0].failure_type, FailureType::Unknown);

    let failures = a.analyze_failure("java.lang.OutOfMemoryError: Java heap space");
    assert_eq!(failures[0].failure_type, FailureType::Resource);
}

#[test]
fn confidence_is_monotonic_in_severity() {
    let a = analyzer(Platform::Github);
    let fixes = a.catalog().lookup_fixes(FailureType::Build, &Platform::Github);
    let one = &fixes[..1];

    let critical = calculate_confidence(&failure(FailureType::Build, FailureSeverity::Critical), one);
    let low = calculate_confidence(&failure(FailureType::Build, FailureSeverity::Low), one);
    assert!(critical > low);
}

#[test]
fn unknown_confidence_never_exceeds_sixty() {
    let a = analyzer(Platform::Github);
    let fixes = a.catalog().lookup_fixes(FailureType::Unknown, &Platform::Github);

    for severity in [
        FailureSeverity::Critical,
        FailureSeverity::High,
        FailureSeverity::Medium,
        FailureSeverity::Low,
    ] {
        let f = failure(FailureType::Unknown, severity);
        assert!(calculate_confidence(&f, &fixes) <= 60);
        assert!(calculate_confidence(&f, &[]) <= 60);
    }
    assert_eq!(
        calculate_confidence(&failure(FailureType::Unknown, FailureSeverity::Low), &[]),
        0
    );
}

#[test]
fn summary_counts_by_type() {
    let a = analyzer(Platform::Aws);
    let failures = a.analyze_failure(
        "Phase context status code: COMMAND_EXECUTION_ERROR\nUser: arn:aws:iam::1:role/x is not authorized to perform: s3:PutObject",
    );
    let summary = AnalysisSummary::from_suggestions(&a.suggest_fixes(&failures));

    assert_eq!(summary.total, failures.len());
    assert_eq!(summary.by_type.get("build"), Some(&1));
    assert_eq!(summary.by_type.get("permission"), Some(&1));
    assert_eq!(summary.highest_severity, Some(FailureSeverity::High));
}

#[test]
fn analyzer_is_shareable_across_threads() {
    let a = analyzer(Platform::CircleCi);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let a = a.clone();
            thread::spawn(move || a.analyze_failure("Too long with no output (exceeded 10m0s)"))
        })
        .collect();

    for handle in handles {
        let failures = handle.join().unwrap();
        assert_eq!(failures[0].failure_type, FailureType::Timeout);
    }
}
