//! Verification reports
//!
//! Collects trust events into a timestamped log that can be written as a
//! Markdown table or a JSON array.

use crate::trust::{TrustLevel, VerificationFailure, VerificationObserver};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSeverity {
    Info,
    Warning,
    Fatal,
}

impl ReportSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSeverity::Info => "Info",
            ReportSeverity::Warning => "Warning",
            ReportSeverity::Fatal => "Fatal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub timestamp_utc: DateTime<Utc>,
    pub severity: ReportSeverity,
    pub title: String,
    pub details: String,
    pub source: String,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}

/// Output format, chosen from the file extension by [`ReportWriter::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Markdown,
        }
    }
}

/// Thread-safe report collector
#[derive(Debug, Default)]
pub struct ReportWriter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReportEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, entry: ReportEntry) {
        self.lock().push(entry);
    }

    /// Record an entry stamped with the current time
    pub fn add(&self, severity: ReportSeverity, title: &str, details: &str, source: &str) {
        self.push(ReportEntry {
            timestamp_utc: Utc::now(),
            severity,
            title: title.to_string(),
            details: details.to_string(),
            source: source.to_string(),
        });
    }

    pub fn entries(&self) -> Vec<ReportEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Highest severity recorded so far
    pub fn worst_severity(&self) -> Option<ReportSeverity> {
        self.lock()
            .iter()
            .map(|e| e.severity)
            .max_by_key(|s| *s as u8)
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Codexium Magnus Report\n");
        let _ = writeln!(out, "Generated: {}\n", iso(&Utc::now()));
        out.push_str("| Time (UTC) | Severity | Source | Title |\n");
        out.push_str("|------------|----------|--------|-------|\n");

        for entry in self.lock().iter() {
            let source = if entry.source.is_empty() {
                "-"
            } else {
                entry.source.as_str()
            };
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                iso(&entry.timestamp_utc),
                entry.severity.as_str(),
                source,
                entry.title.replace('|', "/")
            );
        }
        out
    }

    pub fn render_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(&*self.lock())?)
    }

    pub fn write_markdown(&self, path: &Path) -> Result<(), ReportError> {
        write_file(path, self.render_markdown())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        write_file(path, self.render_json()?)
    }

    /// Write in the format implied by the extension (`.json` or Markdown)
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        match ReportFormat::from_path(path) {
            ReportFormat::Json => self.write_json(path),
            ReportFormat::Markdown => self.write_markdown(path),
        }
    }
}

impl VerificationObserver for ReportWriter {
    fn cartridge_verified(&self, path: &Path, level: TrustLevel) {
        let severity = match level {
            TrustLevel::Official | TrustLevel::Verified => ReportSeverity::Info,
            TrustLevel::Unverified | TrustLevel::Homebrew => ReportSeverity::Warning,
            TrustLevel::Invalid => ReportSeverity::Fatal,
        };
        self.add(
            severity,
            &format!("Cartridge trust: {level}"),
            "",
            &path.display().to_string(),
        );
    }

    fn verification_failed(&self, path: &Path, failure: VerificationFailure) {
        self.add(
            ReportSeverity::Fatal,
            "Verification failed",
            failure.reason(),
            &path.display().to_string(),
        );
    }
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_file(path: &Path, content: String) -> Result<(), ReportError> {
    let write_error = |source: std::io::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, content).map_err(write_error)?;
    debug!("Report written to {}", path.display());
    Ok(())
}
