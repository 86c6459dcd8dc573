//! Failure pattern and remediation catalog for pipemedic.
//!
//! The catalog is an immutable rule table: platform-agnostic patterns and
//! fixes plus per-platform overlays. It is built once and shared read-only
//! (usually behind an `Arc`) by every analyzer.

pub mod fixes;
pub mod patterns;
pub mod types;

pub use types::{FailureFix, FailurePattern, FailureSeverity, FailureType};

use pipemedic_common::{Platform, Result};
use std::collections::HashMap;
use tracing::debug;

/// Immutable registry of detection rules and fixes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    common_patterns: Vec<FailurePattern>,
    platform_patterns: HashMap<Platform, Vec<FailurePattern>>,
    common_fixes: Vec<FailureFix>,
    platform_fixes: Vec<FailureFix>,
}

impl Catalog {
    /// Create a catalog from explicit tables.
    pub fn new(
        common_patterns: Vec<FailurePattern>,
        platform_patterns: HashMap<Platform, Vec<FailurePattern>>,
        common_fixes: Vec<FailureFix>,
        platform_fixes: Vec<FailureFix>,
    ) -> Self {
        Self {
            common_patterns,
            platform_patterns,
            common_fixes,
            platform_fixes,
        }
    }

    /// Compile the built-in rule and fix tables.
    ///
    /// An invalid built-in regex is reported as an error here so that the
    /// caller can abort at startup.
    pub fn builtin() -> Result<Self> {
        let common_patterns = patterns::compile_rules(patterns::COMMON_RULES)?;

        let mut platform_patterns = HashMap::new();
        for (platform, specs) in patterns::PLATFORM_RULES {
            platform_patterns.insert(Platform::from(*platform), patterns::compile_rules(specs)?);
        }

        let catalog = Self::new(
            common_patterns,
            platform_patterns,
            fixes::build_fixes(fixes::COMMON_FIXES),
            fixes::build_fixes(fixes::PLATFORM_FIXES),
        );

        debug!(
            "Catalog loaded: {} common rules, {} platform overlays, {} fixes",
            catalog.common_patterns.len(),
            catalog.platform_patterns.len(),
            catalog.common_fixes.len() + catalog.platform_fixes.len()
        );

        Ok(catalog)
    }

    /// Rules to evaluate for `platform`: common rules, then the overlay.
    ///
    /// Unknown platforms get an empty overlay.
    pub fn lookup_patterns(&self, platform: &Platform) -> Vec<&FailurePattern> {
        let overlay = self
            .platform_patterns
            .get(platform)
            .map(Vec::as_slice)
            .unwrap_or_default();

        self.common_patterns.iter().chain(overlay).collect()
    }

    /// Fixes for `failure_type`: common fixes, then those specific to `platform`.
    pub fn lookup_fixes(&self, failure_type: FailureType, platform: &Platform) -> Vec<&FailureFix> {
        let common = self
            .common_fixes
            .iter()
            .filter(|f| f.applies_to == failure_type);
        let specific = self
            .platform_fixes
            .iter()
            .filter(|f| f.applies_to == failure_type && f.supports(platform));

        common.chain(specific).collect()
    }

    /// Total number of matchers across all rules and overlays.
    pub fn matcher_count(&self) -> usize {
        self.common_patterns
            .iter()
            .chain(self.platform_patterns.values().flatten())
            .map(|p| p.matchers.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.matcher_count() > 50);
    }

    #[test]
    fn test_overlay_follows_common_rules() {
        let catalog = Catalog::builtin().unwrap();
        let common = catalog.lookup_patterns(&Platform::Other("jenkins".into()));
        let github = catalog.lookup_patterns(&Platform::Github);

        assert_eq!(common.len(), patterns::COMMON_RULES.len());
        assert!(github.len() > common.len());
        for (a, b) in common.iter().zip(&github) {
            assert_eq!(a.description, b.description);
        }
    }

    #[test]
    fn test_platform_fixes_are_filtered() {
        let catalog = Catalog::builtin().unwrap();

        let github = catalog.lookup_fixes(FailureType::Permission, &Platform::Github);
        let gitlab = catalog.lookup_fixes(FailureType::Permission, &Platform::Gitlab);

        assert!(github.iter().any(|f| f.platform_specific));
        assert!(gitlab.iter().all(|f| !f.platform_specific));
        assert!(github.iter().all(|f| f.applies_to == FailureType::Permission));
        // common fixes come first
        assert!(!github[0].platform_specific);
    }

    #[test]
    fn test_unknown_type_fixes() {
        let catalog = Catalog::builtin().unwrap();
        let fixes = catalog.lookup_fixes(FailureType::Unknown, &Platform::Aws);
        assert_eq!(fixes.len(), 2);
        assert!(fixes.iter().all(|f| !f.has_script()));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = FailurePattern::new(
            FailureType::Build,
            FailureSeverity::High,
            &["ok", "(unclosed"],
            "broken rule",
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("broken rule"));
        assert!(message.contains("(unclosed"));
    }

    #[test]
    fn test_custom_catalog() {
        let rule = FailurePattern::new(
            FailureType::Network,
            FailureSeverity::Low,
            &["flaky"],
            "custom",
        )
        .unwrap();
        let catalog = Catalog::new(vec![rule], HashMap::new(), vec![], vec![]);

        assert_eq!(catalog.lookup_patterns(&Platform::Github).len(), 1);
        assert!(catalog
            .lookup_fixes(FailureType::Network, &Platform::Github)
            .is_empty());
    }

    #[test]
    fn test_severity_rank_order() {
        let mut severities = vec![
            FailureSeverity::Low,
            FailureSeverity::Critical,
            FailureSeverity::Medium,
            FailureSeverity::High,
        ];
        severities.sort_by_key(|s| s.rank());
        assert_eq!(
            severities,
            vec![
                FailureSeverity::Critical,
                FailureSeverity::High,
                FailureSeverity::Medium,
                FailureSeverity::Low,
            ]
        );
    }

    #[test]
    fn test_enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&FailureType::Configuration).unwrap(),
            "\"configuration\""
        );
        assert_eq!(
            serde_json::to_string(&FailureSeverity::Critical).unwrap(),
            "\"critical\""
        );
    }
}
