//! CI/CD platform identifiers.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Target CI/CD platform.
///
/// Unrecognized identifiers are kept as [`Platform::Other`] rather than
/// rejected; they simply select no platform overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    #[default]
    Github,
    Gitlab,
    CircleCi,
    Aws,
    Other(String),
}

impl Platform {
    /// Canonical lowercase identifier.
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Github => "github",
            Platform::Gitlab => "gitlab",
            Platform::CircleCi => "circleci",
            Platform::Aws => "aws",
            Platform::Other(name) => name,
        }
    }

    /// Whether this is one of the platforms with a built-in overlay.
    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Other(_))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "github" | "github-actions" | "gh" => Platform::Github,
            "gitlab" | "gitlab-ci" => Platform::Gitlab,
            "circleci" | "circle" => Platform::CircleCi,
            "aws" | "codebuild" | "codepipeline" | "aws-codepipeline" => Platform::Aws,
            _ => Platform::Other(normalized),
        })
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(platform) => platform,
            Err(never) => match never {},
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform::from(s.as_str())
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        p.as_str().to_string()
    }
}
