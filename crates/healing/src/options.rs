//! Self-healing configuration.

use pipemedic_common::{Error, Platform, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default directory for analysis and fix-attempt records.
pub const DEFAULT_HISTORY_DIR: &str = ".pipemedic/history";

/// Options for the self-healing manager.
///
/// Every field has a default, so config files only need the keys they change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfHealingOptions {
    pub platform: Platform,
    pub auto_retry: bool,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub auto_fix: bool,
    pub notify_on_failure: bool,
    pub collect_logs: bool,
    /// Upper bound on a single fix script run.
    pub fix_timeout_seconds: u64,
    pub history_dir: PathBuf,
}

impl Default for SelfHealingOptions {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            auto_retry: true,
            max_retries: 3,
            retry_delay_seconds: 60,
            auto_fix: false,
            notify_on_failure: true,
            collect_logs: true,
            fix_timeout_seconds: 300,
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
        }
    }
}

impl SelfHealingOptions {
    /// Defaults for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Default::default()
        }
    }

    /// Load options from a YAML (`.yaml`/`.yml`) or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let options: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        options.validate()?;
        debug!("Loaded options from {:?}: {:?}", path, options);
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fix_timeout_seconds == 0 {
            return Err(Error::Config(
                "fix_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.fix_timeout_seconds)
    }
}
