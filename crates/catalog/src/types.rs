//! Failure classification types shared by the catalog and its consumers.

use pipemedic_common::{Error, Platform, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    Test,
    Build,
    Dependency,
    Resource,
    Network,
    Permission,
    Configuration,
    Timeout,
    Unknown,
}

impl FailureType {
    pub const ALL: [FailureType; 9] = [
        FailureType::Test,
        FailureType::Build,
        FailureType::Dependency,
        FailureType::Resource,
        FailureType::Network,
        FailureType::Permission,
        FailureType::Configuration,
        FailureType::Timeout,
        FailureType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::Test => "test",
            FailureType::Build => "build",
            FailureType::Dependency => "dependency",
            FailureType::Resource => "resource",
            FailureType::Network => "network",
            FailureType::Permission => "permission",
            FailureType::Configuration => "configuration",
            FailureType::Timeout => "timeout",
            FailureType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How severe a failure is.
///
/// Declaration order carries no meaning; use [`FailureSeverity::rank`] for
/// presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FailureSeverity {
    /// Presentation rank, most severe first (`Critical` = 0).
    pub fn rank(&self) -> u8 {
        match self {
            FailureSeverity::Critical => 0,
            FailureSeverity::High => 1,
            FailureSeverity::Medium => 2,
            FailureSeverity::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureSeverity::Low => "low",
            FailureSeverity::Medium => "medium",
            FailureSeverity::High => "high",
            FailureSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for FailureSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detection rule: a set of matchers that all map to one type and severity.
#[derive(Debug, Clone)]
pub struct FailurePattern {
    pub failure_type: FailureType,
    pub severity: FailureSeverity,
    pub matchers: Vec<Regex>,
    pub description: String,
}

impl FailurePattern {
    /// Compile a rule from regex sources.
    ///
    /// Fails on the first source that does not compile; the rule name in the
    /// error is the description.
    pub fn new(
        failure_type: FailureType,
        severity: FailureSeverity,
        patterns: &[&str],
        description: &str,
    ) -> Result<Self> {
        let matchers = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| Error::InvalidPattern {
                    rule: description.to_string(),
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            failure_type,
            severity,
            matchers,
            description: description.to_string(),
        })
    }
}

/// A remediation recipe for one failure type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureFix {
    pub applies_to: FailureType,
    pub description: String,
    pub automated_script: Option<String>,
    pub manual_steps: Vec<String>,
    pub platform_specific: bool,
    pub platforms: BTreeSet<Platform>,
}

impl FailureFix {
    pub fn has_script(&self) -> bool {
        self.automated_script.is_some()
    }

    /// Whether this fix may be offered on `platform`.
    pub fn supports(&self, platform: &Platform) -> bool {
        !self.platform_specific || self.platforms.contains(platform)
    }
}
