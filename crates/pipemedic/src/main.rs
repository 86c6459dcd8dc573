//! Pipemedic - CI/CD failure log analysis and self-healing tool.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pipemedic_analyzer::FixSuggestion;
use pipemedic_catalog::Catalog;
use pipemedic_common::Platform;
use pipemedic_healing::{AnalysisResult, SelfHealingManager, SelfHealingOptions, SelfHealingReport};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pipemedic")]
#[command(
    author,
    version,
    about = "Classify CI/CD failure logs, suggest fixes and score pipeline resilience"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Options file (YAML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Directory for analysis and fix-attempt records
    #[arg(long, global = true)]
    history_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a failure log and suggest fixes
    Analyze {
        /// Log file, or "-" for stdin
        #[arg(long)]
        log: PathBuf,

        /// CI platform (github, gitlab, circleci, aws)
        #[arg(long)]
        platform: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze a log and run a scripted fix
    Fix {
        /// Log file, or "-" for stdin
        #[arg(long)]
        log: PathBuf,

        /// Directory the fix script runs in
        #[arg(long, default_value = ".")]
        working_dir: PathBuf,

        /// Suggestion to apply (default: first auto-fixable)
        #[arg(long)]
        index: Option<usize>,

        /// CI platform (github, gitlab, circleci, aws)
        #[arg(long)]
        platform: Option<String>,
    },

    /// Score a pipeline definition for resilience practices
    Report {
        /// Pipeline definition file, or "-" for stdin
        #[arg(long)]
        pipeline: PathBuf,

        /// CI platform (github, gitlab, circleci, aws)
        #[arg(long)]
        platform: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries command output only
    let (plain, json) = if cli.log_json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(plain)
        .with(json)
        .with(filter)
        .init();

    let catalog = Arc::new(Catalog::builtin().context("Failed to load failure catalog")?);

    match cli.command {
        Commands::Analyze {
            log,
            platform,
            json,
        } => {
            let options = load_options(cli.config.as_deref(), platform, cli.history_dir)?;
            let manager = SelfHealingManager::new(catalog, options);

            let text = read_input(&log)?;
            let result = manager.analyze_failure(&text);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_analysis(&manager.options().platform, &result);
            }
        }

        Commands::Fix {
            log,
            working_dir,
            index,
            platform,
        } => {
            let options = load_options(cli.config.as_deref(), platform, cli.history_dir)?;
            let manager = SelfHealingManager::new(catalog, options);

            let text = read_input(&log)?;
            let result = manager.analyze_failure(&text);
            let suggestion = select_suggestion(&result.suggestions, index)?;

            info!(
                "Applying fix for {} failure in {:?}",
                suggestion.failure.failure_type, working_dir
            );
            let fix = manager.attempt_fix(suggestion, &working_dir).await;

            println!("{}", fix.message);
            if let Some(output) = fix.output.as_deref().filter(|o| !o.is_empty()) {
                print!("{}", output);
            }
            if !fix.success {
                bail!(
                    "Fix failed: {}",
                    fix.error.as_deref().unwrap_or("no automated fix ran")
                );
            }
        }

        Commands::Report {
            pipeline,
            platform,
            json,
        } => {
            let options = load_options(cli.config.as_deref(), platform, cli.history_dir)?;
            let manager = SelfHealingManager::new(catalog, options);

            let text = read_input(&pipeline)?;
            let platform = manager.options().platform.clone();
            let report = manager.generate_self_healing_report(&platform, &text);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&platform, &report);
            }
        }
    }

    Ok(())
}

/// Options from the config file (or defaults) with CLI overrides applied.
fn load_options(
    config: Option<&Path>,
    platform: Option<String>,
    history_dir: Option<PathBuf>,
) -> anyhow::Result<SelfHealingOptions> {
    let mut options = match config {
        Some(path) => SelfHealingOptions::from_file(path)
            .with_context(|| format!("Failed to load options from {:?}", path))?,
        None => SelfHealingOptions::default(),
    };

    if let Some(platform) = platform {
        options.platform = Platform::from(platform);
    }
    if let Some(dir) = history_dir {
        options.history_dir = dir;
    }

    Ok(options)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

fn select_suggestion(
    suggestions: &[FixSuggestion],
    index: Option<usize>,
) -> anyhow::Result<&FixSuggestion> {
    match index {
        Some(i) => suggestions.get(i).with_context(|| {
            format!(
                "Suggestion index {} out of range ({} suggestions)",
                i,
                suggestions.len()
            )
        }),
        None => suggestions
            .iter()
            .find(|s| s.auto_fix_possible)
            .context("No auto-fixable failure found in the log"),
    }
}

fn print_analysis(platform: &Platform, result: &AnalysisResult) {
    let summary = result.summary();
    println!("Platform: {}", platform);
    println!(
        "Detected {} failure(s), highest severity: {}, {} auto-fixable",
        summary.total,
        summary
            .highest_severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string()),
        summary.auto_fixable
    );

    for (i, suggestion) in result.suggestions.iter().enumerate() {
        let failure = &suggestion.failure;
        println!();
        println!(
            "[{}] {} / {}: {}",
            i, failure.failure_type, failure.severity, failure.description
        );
        println!("    matched: {}", failure.message);
        if let Some(location) = &failure.location {
            println!("    at: {}", location);
        }
        println!(
            "    confidence: {}%{}",
            suggestion.confidence,
            if suggestion.auto_fix_possible {
                ", auto-fix available"
            } else {
                ""
            }
        );
        for fix in &suggestion.fixes {
            let marker = if fix.has_script() { "*" } else { "-" };
            println!("    {} {}", marker, fix.description);
        }
    }
}

fn print_report(platform: &Platform, report: &SelfHealingReport) {
    println!(
        "Self-healing score for {}: {}/100",
        platform, report.self_healing_score
    );
    for v in &report.vulnerabilities {
        println!("  [{}] {}", v.severity, v.description);
    }
    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for r in &report.recommendations {
            println!("  - {}", r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "platform: gitlab\nhistory_dir: /tmp/from-file\n").unwrap();

        let options = load_options(
            Some(file.path()),
            Some("circleci".to_string()),
            Some(PathBuf::from("/tmp/from-cli")),
        )
        .unwrap();

        assert_eq!(options.platform, Platform::CircleCi);
        assert_eq!(options.history_dir, PathBuf::from("/tmp/from-cli"));
    }

    #[test]
    fn test_defaults_without_config() {
        let options = load_options(None, None, None).unwrap();
        assert_eq!(options, SelfHealingOptions::default());
    }

    #[test]
    fn test_select_suggestion() {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let options = SelfHealingOptions {
            history_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let manager = SelfHealingManager::new(catalog, options);

        let jest = manager.analyze_failure("FAIL src/x.test.js");
        assert!(select_suggestion(&jest.suggestions, None).is_err());
        assert!(select_suggestion(&jest.suggestions, Some(0)).is_ok());
        assert!(select_suggestion(&jest.suggestions, Some(5)).is_err());

        let npm = manager.analyze_failure("npm ERR! code ERESOLVE");
        let chosen = select_suggestion(&npm.suggestions, None).unwrap();
        assert!(chosen.auto_fix_possible);
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pipemedic",
            "report",
            "--pipeline",
            "ci.yml",
            "--json",
            "--history-dir",
            "/tmp/h",
        ])
        .unwrap();
        assert_eq!(cli.history_dir, Some(PathBuf::from("/tmp/h")));
        assert!(matches!(cli.command, Commands::Report { json: true, .. }));
    }
}
