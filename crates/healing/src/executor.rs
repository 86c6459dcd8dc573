//! Fix script execution.

use async_trait::async_trait;
use pipemedic_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

#[cfg(windows)]
const SCRIPT_SUFFIX: &str = ".cmd";
#[cfg(not(windows))]
const SCRIPT_SUFFIX: &str = ".sh";

/// Captured result of a script run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running remediation scripts.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` with `working_dir` as its current directory.
    ///
    /// Returns `Error::ScriptTimeout` if it does not finish within `timeout`.
    async fn run(&self, script: &str, working_dir: &Path, timeout: Duration)
        -> Result<ScriptOutput>;
}

/// Runs scripts through the local shell from a temporary file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScriptRunner;

impl LocalScriptRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptRunner for LocalScriptRunner {
    async fn run(
        &self,
        script: &str,
        working_dir: &Path,
        timeout: Duration,
    ) -> Result<ScriptOutput> {
        if !working_dir.is_dir() {
            return Err(Error::ScriptExecution(format!(
                "working directory does not exist: {}",
                working_dir.display()
            )));
        }

        let mut file = tempfile::Builder::new()
            .prefix("pipemedic-fix-")
            .suffix(SCRIPT_SUFFIX)
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;
        // Closes the handle; the path guard deletes the file when dropped,
        // on every return path below.
        let script_path = file.into_temp_path();

        debug!(
            "Running fix script {} in {}",
            script_path.display(),
            working_dir.display()
        );

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&*script_path);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg(&*script_path);
            c
        };
        cmd.current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd
            .spawn()
            .map_err(|e| Error::ScriptExecution(format!("failed to spawn shell: {}", e)))?;

        // On timeout the future is dropped with the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Fix script exceeded {:?}, killed", timeout);
                return Err(Error::ScriptTimeout {
                    seconds: timeout.as_secs(),
                });
            }
        };

        Ok(ScriptOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let out = LocalScriptRunner::new()
            .run("cat marker.txt\n", dir.path(), LONG)
            .await
            .unwrap();

        assert!(out.success());
        assert_eq!(out.stdout, "here");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let out = LocalScriptRunner::new()
            .run("echo broken >&2\nexit 3\n", dir.path(), LONG)
            .await
            .unwrap();

        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "broken");
    }

    #[tokio::test]
    async fn test_script_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let out = LocalScriptRunner::new()
            .run("echo \"$0\"\n", dir.path(), LONG)
            .await
            .unwrap();

        let script_path = out.stdout.trim();
        assert!(script_path.contains("pipemedic-fix-"));
        assert!(!Path::new(script_path).exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_script_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("path.txt");
        let script = format!("echo \"$0\" > '{}'\nsleep 30\n", marker.display());

        let err = LocalScriptRunner::new()
            .run(&script, dir.path(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScriptTimeout { .. }));

        let script_path = std::fs::read_to_string(&marker).unwrap();
        assert!(!Path::new(script_path.trim()).exists());
    }

    #[tokio::test]
    async fn test_missing_working_directory() {
        let err = LocalScriptRunner::new()
            .run("true\n", Path::new("/nonexistent/pipemedic"), LONG)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScriptExecution(_)));
    }
}
