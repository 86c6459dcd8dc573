//! Built-in remediation recipes.

use crate::types::{FailureFix, FailureType};
use pipemedic_common::Platform;

use FailureType::*;

/// Declarative form of a [`FailureFix`].
#[derive(Debug, Clone, Copy)]
pub struct FixSpec {
    pub applies_to: FailureType,
    pub description: &'static str,
    pub script: Option<&'static str>,
    pub manual_steps: &'static [&'static str],
    /// Empty for fixes that apply on every platform.
    pub platforms: &'static [&'static str],
}

impl FixSpec {
    pub fn build(&self) -> FailureFix {
        FailureFix {
            applies_to: self.applies_to,
            description: self.description.to_string(),
            automated_script: self.script.map(str::to_string),
            manual_steps: self.manual_steps.iter().map(|s| s.to_string()).collect(),
            platform_specific: !self.platforms.is_empty(),
            platforms: self.platforms.iter().map(|p| Platform::from(*p)).collect(),
        }
    }
}

const REINSTALL_DEPENDENCIES: &str = r#"set -e
if [ -f package-lock.json ]; then
  rm -rf node_modules
  npm ci --legacy-peer-deps
elif [ -f package.json ]; then
  npm install --legacy-peer-deps
elif [ -f requirements.txt ]; then
  python -m pip install --upgrade -r requirements.txt
elif [ -f Cargo.toml ]; then
  cargo update
else
  echo "no supported dependency manifest found" >&2
  exit 1
fi
"#;

const CLEAN_REBUILD: &str = r#"set -e
rm -rf dist build out .next
if [ -f package.json ]; then
  npm run build --if-present
elif [ -f Cargo.toml ]; then
  cargo clean
  cargo build
elif [ -f Makefile ]; then
  make clean
  make
fi
"#;

const FREE_DISK_SPACE: &str = r#"df -h .
docker system prune -af --volumes 2>/dev/null || true
rm -rf "${TMPDIR:-/tmp}"/npm-* 2>/dev/null || true
df -h .
"#;

const CLEAR_PACKAGE_CACHES: &str = r#"npm cache clean --force 2>/dev/null || true
python -m pip cache purge 2>/dev/null || true
"#;

const RESTORE_EXEC_BITS: &str = r#"find . -name '*.sh' -not -path './node_modules/*' -exec chmod +x {} +
"#;

/// Fixes offered on every platform.
pub const COMMON_FIXES: &[FixSpec] = &[
    FixSpec {
        applies_to: Test,
        description: "Investigate the failing assertions",
        script: None,
        manual_steps: &[
            "Open the first failing test reported in the log",
            "Compare the expected and actual values in the assertion output",
            "Fix the code under test, or update the expectation if the behavior change is intended",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Test,
        description: "Reproduce the failure locally",
        script: None,
        manual_steps: &[
            "Run only the failing test file with the same runtime version as CI",
            "Check for order-dependent or time-dependent shared state",
            "Quarantine the test if it is flaky and track the fix separately",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Test,
        description: "Refresh outdated snapshots",
        script: None,
        manual_steps: &[
            "Review the snapshot diff in the log",
            "Regenerate snapshots locally (for example `jest -u`) and commit them",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Build,
        description: "Clean build outputs and rebuild",
        script: Some(CLEAN_REBUILD),
        manual_steps: &[
            "Delete generated build directories",
            "Run the build again from a clean tree",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Build,
        description: "Fix the reported compiler errors",
        script: None,
        manual_steps: &[
            "Go to the first file and line reported by the compiler",
            "Resolve the error; later errors are often consequences of the first",
            "Make sure the CI toolchain version matches the local one",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Dependency,
        description: "Reinstall dependencies from a clean state",
        script: Some(REINSTALL_DEPENDENCIES),
        manual_steps: &[
            "Remove the installed dependency directory",
            "Reinstall from the lockfile",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Dependency,
        description: "Resolve conflicting version constraints",
        script: None,
        manual_steps: &[
            "Read the conflict reported by the package manager",
            "Align peer dependency versions or pin a compatible release",
            "Regenerate the lockfile and commit it",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Dependency,
        description: "Verify the package name and registry",
        script: None,
        manual_steps: &[
            "Check the package name and version for typos",
            "Confirm the registry URL and credentials used by CI",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Resource,
        description: "Free disk space on the runner",
        script: Some(FREE_DISK_SPACE),
        manual_steps: &[
            "Remove unused container images and volumes",
            "Clean temporary package manager files",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Resource,
        description: "Reduce memory pressure",
        script: None,
        manual_steps: &[
            "Raise the Node.js heap limit with NODE_OPTIONS=--max-old-space-size=4096",
            "Lower build or test parallelism",
            "Move the job to a runner with more memory",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Network,
        description: "Retry the step with backoff",
        script: None,
        manual_steps: &[
            "Re-run the job; transient network errors often clear on their own",
            "Wrap network-bound commands in a retry loop with exponential backoff",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Network,
        description: "Clear package manager caches",
        script: Some(CLEAR_PACKAGE_CACHES),
        manual_steps: &["Clear npm and pip caches that may hold partial downloads"],
        platforms: &[],
    },
    FixSpec {
        applies_to: Network,
        description: "Check external service status",
        script: None,
        manual_steps: &[
            "Check the status page of the registry or API that failed",
            "Configure a mirror or proxy if the upstream is unreliable",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Permission,
        description: "Restore executable bits on scripts",
        script: Some(RESTORE_EXEC_BITS),
        manual_steps: &["Mark repository shell scripts as executable and commit the mode change"],
        platforms: &[],
    },
    FixSpec {
        applies_to: Permission,
        description: "Review credentials and token scopes",
        script: None,
        manual_steps: &[
            "Confirm the secret used by the job exists and has not expired",
            "Grant the token the scopes required by the failing step",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Configuration,
        description: "Validate the pipeline configuration",
        script: None,
        manual_steps: &[
            "Run the platform's configuration linter on the pipeline file",
            "Check indentation and key names around the reported location",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Configuration,
        description: "Provide missing environment variables",
        script: None,
        manual_steps: &[
            "List the variables the failing step reads",
            "Define them as pipeline variables or secrets",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Raise the step timeout",
        script: None,
        manual_steps: &[
            "Compare the step duration with its configured limit",
            "Increase the limit if the work legitimately grew",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Speed up the job",
        script: None,
        manual_steps: &[
            "Cache dependencies between runs",
            "Split long test suites across parallel jobs",
            "Look for hung processes waiting on input or network",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Unknown,
        description: "Inspect the full job log",
        script: None,
        manual_steps: &[
            "Search the log for the first error or non-zero exit code",
            "Compare with the last successful run of the same job",
        ],
        platforms: &[],
    },
    FixSpec {
        applies_to: Unknown,
        description: "Re-run with debug logging",
        script: None,
        manual_steps: &["Enable verbose or debug logging for the job and run it again"],
        platforms: &[],
    },
];

/// Fixes that only apply on the listed platforms.
pub const PLATFORM_FIXES: &[FixSpec] = &[
    FixSpec {
        applies_to: Permission,
        description: "Grant the workflow token the required permissions",
        script: None,
        manual_steps: &[
            "Add a `permissions:` block to the workflow or job",
            "Grant only the scopes the failing step needs, for example `contents: write`",
            "Use a fine-grained token stored as a secret when GITHUB_TOKEN cannot be scoped enough",
        ],
        platforms: &["github"],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Set an explicit timeout-minutes",
        script: None,
        manual_steps: &[
            "Add `timeout-minutes` to the job or step",
            "Keep it close to the expected duration so hung jobs fail fast",
        ],
        platforms: &["github"],
    },
    FixSpec {
        applies_to: Network,
        description: "Wrap flaky steps in a retry action",
        script: None,
        manual_steps: &[
            "Replace the failing `run:` step with `nick-fields/retry` and set `max_attempts`",
        ],
        platforms: &["github"],
    },
    FixSpec {
        applies_to: Dependency,
        description: "Cache dependencies with actions/cache",
        script: None,
        manual_steps: &[
            "Add an `actions/cache` step keyed on the lockfile hash",
            "Or enable the `cache:` input of the setup action",
        ],
        platforms: &["github"],
    },
    FixSpec {
        applies_to: Configuration,
        description: "Lint workflows with actionlint",
        script: Some(
            r#"if command -v actionlint >/dev/null 2>&1; then
  actionlint
else
  echo "actionlint is not installed" >&2
  exit 1
fi
"#,
        ),
        manual_steps: &["Run actionlint on .github/workflows and fix the reported issues"],
        platforms: &["github"],
    },
    FixSpec {
        applies_to: Network,
        description: "Retry on runner system failures",
        script: None,
        manual_steps: &[
            "Add `retry: { max: 2, when: [runner_system_failure, stuck_or_timeout_failure] }` to the job",
        ],
        platforms: &["gitlab"],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Increase the job timeout",
        script: None,
        manual_steps: &["Set `timeout:` on the job or raise the project CI/CD timeout"],
        platforms: &["gitlab"],
    },
    FixSpec {
        applies_to: Configuration,
        description: "Lint .gitlab-ci.yml",
        script: None,
        manual_steps: &["Validate the file with the CI Lint tool in the pipeline editor"],
        platforms: &["gitlab"],
    },
    FixSpec {
        applies_to: Resource,
        description: "Route the job to a larger runner",
        script: None,
        manual_steps: &["Use `tags:` to select a runner with more memory or disk"],
        platforms: &["gitlab"],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Raise no_output_timeout",
        script: None,
        manual_steps: &["Set `no_output_timeout` on long silent `run` steps"],
        platforms: &["circleci"],
    },
    FixSpec {
        applies_to: Resource,
        description: "Use a larger resource_class",
        script: None,
        manual_steps: &["Raise the job's `resource_class` to get more CPU and memory"],
        platforms: &["circleci"],
    },
    FixSpec {
        applies_to: Configuration,
        description: "Validate config with the CircleCI CLI",
        script: Some(
            r#"if command -v circleci >/dev/null 2>&1; then
  circleci config validate
else
  echo "circleci CLI is not installed" >&2
  exit 1
fi
"#,
        ),
        manual_steps: &["Run `circleci config validate` and fix the reported schema errors"],
        platforms: &["circleci"],
    },
    FixSpec {
        applies_to: Permission,
        description: "Update the CodeBuild service role policy",
        script: None,
        manual_steps: &[
            "Find the denied action in the error message",
            "Add it to the service role policy, scoped to the needed resource",
        ],
        platforms: &["aws"],
    },
    FixSpec {
        applies_to: Resource,
        description: "Use a larger compute type",
        script: None,
        manual_steps: &["Switch the CodeBuild project to a larger `computeType`"],
        platforms: &["aws"],
    },
    FixSpec {
        applies_to: Timeout,
        description: "Raise the build timeout",
        script: None,
        manual_steps: &["Increase `timeoutInMinutes` on the CodeBuild project"],
        platforms: &["aws"],
    },
    FixSpec {
        applies_to: Network,
        description: "Back off on throttled AWS API calls",
        script: None,
        manual_steps: &[
            "Set `AWS_RETRY_MODE=adaptive` and a higher `AWS_MAX_ATTEMPTS` for the build",
            "Spread concurrent deployments over time",
        ],
        platforms: &["aws"],
    },
];

/// Build owned fixes from a table.
pub fn build_fixes(specs: &[FixSpec]) -> Vec<FailureFix> {
    specs.iter().map(FixSpec::build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_fixes_cover_every_type() {
        for t in FailureType::ALL {
            assert!(
                COMMON_FIXES.iter().any(|f| f.applies_to == t),
                "no fix for {}",
                t
            );
        }
    }

    #[test]
    fn test_no_scripted_test_fix() {
        assert!(COMMON_FIXES
            .iter()
            .chain(PLATFORM_FIXES)
            .filter(|f| f.applies_to == Test)
            .all(|f| f.script.is_none()));
    }

    #[test]
    fn test_dependency_has_scripted_fix() {
        assert!(COMMON_FIXES
            .iter()
            .any(|f| f.applies_to == Dependency && f.script.is_some()));
    }

    #[test]
    fn test_platform_fixes_are_marked() {
        for fix in build_fixes(PLATFORM_FIXES) {
            assert!(fix.platform_specific);
            assert!(fix.platforms.iter().all(|p| p.is_known()));
        }
        assert!(build_fixes(COMMON_FIXES).iter().all(|f| !f.platform_specific));
    }
}
