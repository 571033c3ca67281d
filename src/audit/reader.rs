//! Audit log reader. Filters and displays session logs.
//!
//! Reads JSONL log files and provides filtering, summarization,
//! and pretty-printing for the `goalgate log` command.

use crate::approval::types::ApprovalStatus;
use crate::audit::types::*;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and queries audit log files.
pub struct AuditReader {
    log_dir: PathBuf,
}

impl AuditReader {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
        }
    }

    /// Read all entries from a session log file.
    pub fn read_session(&self, session_id: &str) -> Result<Vec<AuditEntry>> {
        let path = self.log_dir.join(format!("{}.jsonl", session_id));
        self.read_file(&path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<AuditEntry>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read log file: {}", path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse audit entry at line {}", i + 1))
            })
            .collect()
    }

    /// Read entries from the most recent session.
    pub fn read_latest_session(&self) -> Result<Vec<AuditEntry>> {
        match self.find_latest_session()? {
            Some(path) => self.read_file(&path),
            None => Ok(Vec::new()),
        }
    }

    fn find_latest_session(&self) -> Result<Option<PathBuf>> {
        if !self.log_dir.exists() {
            return Ok(None);
        }

        let mut entries: Vec<PathBuf> = self.session_files()?;

        // Most recently modified first
        entries.sort_by(|a, b| {
            let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
            let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        Ok(entries.into_iter().next())
    }

    fn session_files(&self) -> Result<Vec<PathBuf>> {
        Ok(fs::read_dir(&self.log_dir)
            .with_context(|| format!("Failed to list {}", self.log_dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "jsonl"))
            .collect())
    }

    /// List all available session IDs, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        if !self.log_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions: Vec<String> = self
            .session_files()?
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();

        sessions.sort();
        Ok(sessions)
    }

    /// Filter entries based on criteria.
    pub fn filter_entries(entries: &[AuditEntry], filter: &LogFilter) -> Vec<AuditEntry> {
        entries
            .iter()
            .filter(|e| filter.event.map_or(true, |event| e.event == event))
            .filter(|e| filter.risk.map_or(true, |risk| e.risk == risk))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Generate a summary for a set of entries. Outcomes are counted from
    /// resolution entries only, so each request counts once.
    pub fn summarize(entries: &[AuditEntry]) -> SessionSummary {
        let mut summary = SessionSummary::default();

        if let Some(first) = entries.first() {
            summary.session_id = first.session_id.clone();
            summary.start_time = Some(first.timestamp);
        }
        if let Some(last) = entries.last() {
            summary.end_time = Some(last.timestamp);
        }

        for entry in entries {
            match entry.event {
                AuditEvent::Requested => summary.requested += 1,
                AuditEvent::TimedOut => summary.timed_out += 1,
                AuditEvent::Cancelled => summary.cancelled += 1,
                AuditEvent::Decided => match entry.status {
                    ApprovalStatus::Approved => summary.approved += 1,
                    _ => summary.denied += 1,
                },
            }
        }

        summary
    }

    /// Pretty-print an entry for terminal display.
    pub fn format_entry(entry: &AuditEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S").to_string();
        let status = match entry.status {
            ApprovalStatus::Waiting => "WAITING".yellow().to_string(),
            ApprovalStatus::Approved => "APPROVED".green().to_string(),
            ApprovalStatus::Denied => "DENIED".red().to_string(),
            ApprovalStatus::TimedOut => "TIMED_OUT".magenta().to_string(),
        };

        let mut line = format!(
            "[{}] {:<10} {} {} ({} risk)",
            timestamp.dimmed(),
            entry.event.to_string().bold(),
            status,
            entry.action_summary,
            entry.risk
        );

        if let Some(wait_ms) = entry.wait_ms {
            line.push_str(&format!(" {}", format!("after {}ms", wait_ms).dimmed()));
        }

        line
    }
}
