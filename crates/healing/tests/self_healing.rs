//! End-to-end tests with the file history store and the local shell.

use pipemedic_catalog::{Catalog, FailureFix, FailurePattern, FailureSeverity, FailureType};
use pipemedic_common::Platform;
use pipemedic_healing::{SelfHealingManager, SelfHealingOptions};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn options(history_dir: &Path) -> SelfHealingOptions {
    SelfHealingOptions {
        history_dir: history_dir.to_path_buf(),
        ..SelfHealingOptions::for_platform(Platform::Github)
    }
}

fn history_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Catalog whose only fix touches a marker file in the working directory.
fn touch_catalog(script: &str) -> Catalog {
    let pattern = FailurePattern::new(
        FailureType::Build,
        FailureSeverity::High,
        &[r"stale artifact"],
        "Stale build output",
    )
    .unwrap();

    let fix = FailureFix {
        applies_to: FailureType::Build,
        description: "Clear stale artifacts".to_string(),
        automated_script: Some(script.to_string()),
        manual_steps: vec![],
        platform_specific: false,
        platforms: BTreeSet::new(),
    };

    Catalog::new(vec![pattern], HashMap::new(), vec![fix], vec![])
}

#[test]
fn test_analysis_writes_one_record_per_call() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");
    let catalog = Arc::new(Catalog::builtin().unwrap());
    let manager = SelfHealingManager::new(catalog, options(&history));

    let log = "npm ERR! code ERESOLVE\nnpm ERR! ERESOLVE could not resolve dependency tree\nNPM_TOKEN=s3cr3t-value\n";
    let first = manager.analyze_failure(log);
    let second = manager.analyze_failure(log);
    assert_eq!(first, second);

    let files = history_files(&history);
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.starts_with("analysis-github-")));

    let content = fs::read_to_string(history.join(&files[0])).unwrap();
    assert!(!content.contains("s3cr3t-value"));
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["kind"], "analysis");
    assert_eq!(value["failures"][0]["failure_type"], "dependency");
}

#[test]
fn test_unwritable_history_does_not_fail_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let catalog = Arc::new(Catalog::builtin().unwrap());
    let manager = SelfHealingManager::new(catalog, options(&blocker.join("history")));

    let result = manager.analyze_failure("Error: read ECONNRESET");
    assert_eq!(result.failures[0].failure_type, FailureType::Network);
}

#[cfg(unix)]
#[tokio::test]
async fn test_fix_runs_in_working_directory_and_is_recorded() {
    let history = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();

    let catalog = Arc::new(touch_catalog("touch fixed.txt\necho cleaned\n"));
    let manager = SelfHealingManager::new(catalog, options(history.path()));

    let analysis = manager.analyze_failure("error: stale artifact in target/");
    let suggestion = &analysis.suggestions[0];
    assert!(suggestion.auto_fix_possible);

    let result = manager.attempt_fix(suggestion, workdir.path()).await;
    assert!(result.success, "{:?}", result);
    assert_eq!(result.output.as_deref(), Some("cleaned\n"));
    assert!(workdir.path().join("fixed.txt").exists());

    let files = history_files(history.path());
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|f| f.starts_with("fix_attempt-github-")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_fix_timeout_returns_failure() {
    let history = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();

    let catalog = Arc::new(touch_catalog("sleep 30\n"));
    let options = SelfHealingOptions {
        fix_timeout_seconds: 1,
        ..options(history.path())
    };
    let manager = SelfHealingManager::new(catalog, options);

    let analysis = manager.analyze_failure("stale artifact");
    let result = manager
        .attempt_fix(&analysis.suggestions[0], workdir.path())
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Script timed out after 1s"));
}
