//! Append-only history of analyses and fix attempts.
//!
//! Every call produces one self-contained JSON document. Records are never
//! updated or read back by pipemedic itself.

use crate::redact::redact_secrets;
use pipemedic_analyzer::{DetectedFailure, FixSuggestion};
use pipemedic_common::{hash, Error, Platform, Result, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Characters of the log kept in an analysis record.
pub const LOG_EXCERPT_CHARS: usize = 1000;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Record of one `analyze_failure` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: Timestamp,
    pub platform: Platform,
    /// Redacted leading excerpt; absent when log collection is disabled.
    pub log_excerpt: Option<String>,
    pub log_sha256: String,
    pub log_bytes: usize,
    pub truncated: bool,
    pub failures: Vec<DetectedFailure>,
    pub suggestions: Vec<FixSuggestion>,
}

impl AnalysisRecord {
    pub fn new(
        platform: Platform,
        log: &str,
        collect_logs: bool,
        failures: &[DetectedFailure],
        suggestions: &[FixSuggestion],
    ) -> Self {
        // Redact before cutting so a secret straddling the cut is still caught.
        let (log_excerpt, truncated) = if collect_logs {
            let redacted = redact_secrets(log).content;
            let (cut, truncated) = excerpt(&redacted, LOG_EXCERPT_CHARS);
            (Some(cut.to_string()), truncated)
        } else {
            (None, excerpt(log, LOG_EXCERPT_CHARS).1)
        };

        Self {
            timestamp: Timestamp::now(),
            platform,
            log_excerpt,
            log_sha256: hash::sha256_str(log),
            log_bytes: log.len(),
            truncated,
            failures: failures.to_vec(),
            suggestions: suggestions.to_vec(),
        }
    }
}

/// Record of one `attempt_fix` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixAttemptRecord {
    pub timestamp: Timestamp,
    pub platform: Platform,
    pub working_directory: PathBuf,
    pub fix_description: String,
    pub suggestion: FixSuggestion,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// A persisted history document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryRecord {
    Analysis(AnalysisRecord),
    FixAttempt(FixAttemptRecord),
}

impl HistoryRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryRecord::Analysis(_) => "analysis",
            HistoryRecord::FixAttempt(_) => "fix_attempt",
        }
    }

    pub fn platform(&self) -> &Platform {
        match self {
            HistoryRecord::Analysis(r) => &r.platform,
            HistoryRecord::FixAttempt(r) => &r.platform,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            HistoryRecord::Analysis(r) => r.timestamp,
            HistoryRecord::FixAttempt(r) => r.timestamp,
        }
    }
}

/// Destination for history records.
pub trait HistoryStore: Send + Sync {
    /// Persist `record`, returning where it was written.
    fn record(&self, record: &HistoryRecord) -> Result<PathBuf>;
}

/// Writes each record as its own JSON file in a directory.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl HistoryStore for FileHistoryStore {
    fn record(&self, record: &HistoryRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(record_file_name(record));
        let json = serde_json::to_string_pretty(record)?;

        // create_new: never clobber an existing record
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::History(format!("cannot create {}: {}", path.display(), e)))?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        debug!("History record written: {}", path.display());
        Ok(path)
    }
}

/// `{kind}-{platform}-{timestamp}-{seq}-{uuid8}.json`
fn record_file_name(record: &HistoryRecord) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nonce = Uuid::new_v4().simple().to_string();

    format!(
        "{}-{}-{}-{:06}-{}.json",
        record.kind(),
        sanitize(record.platform().as_str()),
        record.timestamp().to_file_key(),
        seq,
        &nonce[..8]
    )
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// First `max_chars` characters of `text`, and whether anything was cut.
fn excerpt(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
