//! Built-in failure detection rules.
//!
//! Rules are declared as plain data and compiled once by
//! [`crate::Catalog::builtin`]. Evaluation order is table order: common rules
//! first, then the overlay for the configured platform.

use crate::types::{FailurePattern, FailureSeverity, FailureType};
use pipemedic_common::Result;

use FailureSeverity::*;
use FailureType::*;

/// Declarative form of a [`FailurePattern`].
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub failure_type: FailureType,
    pub severity: FailureSeverity,
    pub patterns: &'static [&'static str],
    pub description: &'static str,
}

impl RuleSpec {
    pub fn compile(&self) -> Result<FailurePattern> {
        FailurePattern::new(
            self.failure_type,
            self.severity,
            self.patterns,
            self.description,
        )
    }
}

/// Compile a table of rules, failing on the first invalid regex.
pub fn compile_rules(specs: &[RuleSpec]) -> Result<Vec<FailurePattern>> {
    specs.iter().map(RuleSpec::compile).collect()
}

/// Rules that apply on every platform.
pub const COMMON_RULES: &[RuleSpec] = &[
    RuleSpec {
        failure_type: Test,
        severity: Medium,
        patterns: &[
            r"(?m)^\s*FAIL\s+\S+",
            r"Tests:\s+\d+ failed",
            r"\b\d+ (?:tests?|examples?|specs?) failed",
            r"AssertionError",
            r"test result: FAILED",
            r"(?m)^FAILED \S+::\S+",
            r"(?m)^--- FAIL: \S+",
        ],
        description: "Test failures detected",
    },
    RuleSpec {
        failure_type: Build,
        severity: High,
        patterns: &[
            r"error\[E\d{4}\]",
            r"error: could not compile",
            r"error TS\d{4,5}:",
            r"\[ERROR\] COMPILATION ERROR",
            r"BUILD FAIL(?:ED|URE)",
            r"make(?:\[\d+\])?: \*\*\* .*Error \d+",
            r"SyntaxError: .+",
            r"Module build failed",
        ],
        description: "Compilation or build step failed",
    },
    RuleSpec {
        failure_type: Dependency,
        severity: High,
        patterns: &[
            r"npm ERR! code E[A-Z]+",
            r"(?i)(?:could not|unable to) resolve dependency tree",
            r"ModuleNotFoundError: No module named '[^']+'",
            r"Cannot find module '[^']+'",
            r"(?i)could not find a version that satisfies the requirement \S+",
            r"failed to select a version for",
            r"(?i)could not resolve dependencies for project",
            r"(?i)no matching version found for \S+",
        ],
        description: "Dependency resolution or installation failed",
    },
    RuleSpec {
        failure_type: Resource,
        severity: Critical,
        patterns: &[
            r"No space left on device",
            r"\bENOSPC\b",
            r"(?i)disk quota exceeded",
        ],
        description: "Runner ran out of disk space",
    },
    RuleSpec {
        failure_type: Resource,
        severity: High,
        patterns: &[
            r"(?i)\bout of memory\b",
            r"java\.lang\.OutOfMemoryError",
            r"\bOOMKilled\b",
            r"(?i)cannot allocate memory",
            r"(?i)(?:exit code|exited with code|status) 137\b",
        ],
        description: "Process ran out of memory",
    },
    RuleSpec {
        failure_type: Network,
        severity: Medium,
        patterns: &[
            r"\bECONNREFUSED\b",
            r"\bECONNRESET\b",
            r"\bENOTFOUND\b",
            r"\bETIMEDOUT\b",
            r"(?i)could not resolve host:?\s*\S+",
            r"(?i)temporary failure in name resolution",
            r"(?i)connection (?:refused|reset by peer|timed out)",
            r"(?i)TLS handshake timeout",
            r"\b(?:502 Bad Gateway|503 Service Unavailable|504 Gateway Time-?out)\b",
            r"(?i)network is unreachable",
        ],
        description: "Network connectivity problem",
    },
    RuleSpec {
        failure_type: Permission,
        severity: High,
        patterns: &[
            r"\bEACCES\b",
            r"\bEPERM\b",
            r"(?i)permission denied",
            r"(?i)access denied",
            r"\b403 Forbidden\b",
            r"\b401 Unauthorized\b",
            r"(?i)authentication (?:failed|required)",
        ],
        description: "Insufficient permissions or failed authentication",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Medium,
        patterns: &[
            r"(?i)mapping values are not allowed in this context",
            r"(?i)(?:yaml|json) (?:syntax|parse|parsing) error",
            r"(?i)environment variable \S+ (?:is )?not (?:set|defined)",
            r"(?i)missing required (?:configuration|config|parameter|input|property)",
            r"(?i)unknown (?:configuration|config) (?:key|option)",
            r"(?i)invalid configuration",
        ],
        description: "Invalid or missing configuration",
    },
    RuleSpec {
        failure_type: Timeout,
        severity: High,
        patterns: &[
            r"(?i)timed out after \d+",
            r"(?i)timeout of \d+\s*(?:ms|s|seconds|minutes) exceeded",
            r"(?i)deadline exceeded",
            r"(?i)execution expired",
        ],
        description: "Step or job exceeded its time limit",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Low,
        patterns: &[
            r"DEPRECATION WARNING",
            r"(?i)is deprecated and will be removed",
        ],
        description: "Deprecated configuration or tooling in use",
    },
];

const GITHUB_RULES: &[RuleSpec] = &[
    RuleSpec {
        failure_type: Permission,
        severity: High,
        patterns: &[
            r"Resource not accessible by integration",
            r"(?i)refusing to allow a (?:GitHub App|Personal Access Token|OAuth App) to create or update workflow",
            r"Permission to \S+ denied to github-actions\[bot\]",
        ],
        description: "Workflow token lacks required permissions",
    },
    RuleSpec {
        failure_type: Timeout,
        severity: High,
        patterns: &[
            r"has exceeded the maximum execution time of \d+ minutes",
            r"Error: The action has timed out\.",
        ],
        description: "GitHub Actions job hit its time limit",
    },
    RuleSpec {
        failure_type: Resource,
        severity: High,
        patterns: &[
            r"The runner has received a shutdown signal",
            r"(?i)lost communication with the server",
        ],
        description: "Hosted runner was lost or shut down",
    },
    RuleSpec {
        failure_type: Dependency,
        severity: High,
        patterns: &[
            r"Unable to resolve action [^\s,]+",
            r"Can't find 'action\.ya?ml'",
        ],
        description: "Referenced action could not be resolved",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Medium,
        patterns: &[r"(?i)invalid workflow file", r"Unexpected value '[^']+'"],
        description: "Workflow file is invalid",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Low,
        patterns: &[
            r"Node\.js \d+ actions are deprecated",
            r"The `set-output` command is deprecated",
        ],
        description: "Workflow uses a deprecated Actions runtime or command",
    },
];

const GITLAB_RULES: &[RuleSpec] = &[
    RuleSpec {
        failure_type: Timeout,
        severity: High,
        patterns: &[r"ERROR: Job failed: execution took longer than [^\r\n]+"],
        description: "GitLab job exceeded its timeout",
    },
    RuleSpec {
        failure_type: Resource,
        severity: High,
        patterns: &[
            r"ERROR: Job failed \(system failure\)",
            r"(?i)runner system failure",
        ],
        description: "GitLab runner system failure",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Medium,
        patterns: &[
            r"(?i)This job is stuck because",
            r"(?i)yaml invalid",
            r"jobs:\S+ config contains unknown keys",
        ],
        description: "GitLab CI configuration is invalid or unschedulable",
    },
    RuleSpec {
        failure_type: Permission,
        severity: High,
        patterns: &[r"HTTP Basic: Access denied", r"\binsufficient_scope\b"],
        description: "GitLab token rejected or under-scoped",
    },
];

const CIRCLECI_RULES: &[RuleSpec] = &[
    RuleSpec {
        failure_type: Timeout,
        severity: High,
        patterns: &[
            r"Too long with no output \(exceeded [^)]+\)",
            r"(?i)build timed out",
        ],
        description: "CircleCI step produced no output or ran too long",
    },
    RuleSpec {
        failure_type: Resource,
        severity: High,
        patterns: &[r#"Received "killed" signal"#],
        description: "CircleCI container was killed",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Medium,
        patterns: &[
            r"(?i)config does not conform to schema",
            r"ERROR IN CONFIG FILE",
        ],
        description: "CircleCI config failed validation",
    },
    RuleSpec {
        failure_type: Permission,
        severity: High,
        patterns: &[r"(?i)restricted context"],
        description: "Job lacks access to a restricted context",
    },
];

const AWS_RULES: &[RuleSpec] = &[
    RuleSpec {
        failure_type: Build,
        severity: High,
        patterns: &[
            r"COMMAND_EXECUTION_ERROR",
            r"Phase complete: BUILD State: FAILED",
        ],
        description: "CodeBuild build phase failed",
    },
    RuleSpec {
        failure_type: Timeout,
        severity: High,
        patterns: &[r"\b[A-Z_]*TIMED_OUT\b"],
        description: "CodeBuild phase timed out",
    },
    RuleSpec {
        failure_type: Permission,
        severity: High,
        patterns: &[
            r"AccessDeniedException",
            r"is not authorized to perform: \S+",
        ],
        description: "IAM role is missing a required permission",
    },
    RuleSpec {
        failure_type: Configuration,
        severity: Medium,
        patterns: &[r"YAML_FILE_ERROR", r"(?i)invalid buildspec"],
        description: "Buildspec is invalid",
    },
    RuleSpec {
        failure_type: Network,
        severity: Low,
        patterns: &[r"ThrottlingException", r"Rate exceeded"],
        description: "AWS API calls were throttled",
    },
];

/// Platform overlays keyed by canonical platform identifier.
pub const PLATFORM_RULES: &[(&str, &[RuleSpec])] = &[
    ("github", GITHUB_RULES),
    ("gitlab", GITLAB_RULES),
    ("circleci", CIRCLECI_RULES),
    ("aws", AWS_RULES),
];
