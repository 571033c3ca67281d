//! Audit log writer — append-only JSONL files.
//!
//! Writes to `<log_dir>/{session_id}.jsonl`, one JSON object per line.
//! Flushes after every write for crash safety.

use crate::audit::types::AuditEntry;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only audit logger that writes JSONL files.
pub struct AuditLogger {
    log_path: PathBuf,
    file: File,
    entry_count: usize,
}

impl AuditLogger {
    /// Create a logger for a session inside `log_dir`.
    /// Creates the directory and file if they don't exist.
    pub fn new(log_dir: impl AsRef<Path>, session_id: &str) -> Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        Self::with_path(log_dir.join(format!("{}.jsonl", session_id)))
    }

    /// Create a logger writing to a specific file.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

        Ok(Self {
            log_path,
            file,
            entry_count: 0,
        })
    }

    /// Serialize `entry` and append it to the file.
    pub fn log(&mut self, entry: &AuditEntry) -> Result<()> {
        let json = serde_json::to_string(entry).context("Failed to serialize audit entry")?;
        writeln!(self.file, "{}", json).context("Failed to write audit entry")?;
        self.file.flush().context("Failed to flush audit log")?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Number of entries written by this logger.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Get the default log directory (~/.goalgate/logs/).
    pub fn default_directory() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".goalgate").join("logs"))
    }
}
