//! Runtime configuration for the control plane.

use crate::audit::AuditLogger;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/goalgate.sock";
pub const CONFIG_FILE_NAME: &str = "goalgate.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// How long an approval request waits before it times out
    pub approval_timeout_secs: u64,

    /// Where audit logs go (default: ~/.goalgate/logs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Control socket path
    pub socket_path: PathBuf,

    /// Working directory for approved commands (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            approval_timeout_secs: DEFAULT_APPROVAL_TIMEOUT_SECS,
            log_dir: None,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            workdir: None,
        }
    }
}

/// Values given on the command line or through the environment.
/// Each one, when set, wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub approval_timeout_secs: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub socket_path: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
}

impl Config {
    pub fn apply(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(timeout) = overrides.approval_timeout_secs {
            self.approval_timeout_secs = timeout;
        }
        if let Some(dir) = overrides.log_dir {
            self.log_dir = Some(dir);
        }
        if let Some(path) = overrides.socket_path {
            self.socket_path = path;
        }
        if let Some(dir) = overrides.workdir {
            self.workdir = Some(dir);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.approval_timeout_secs == 0 {
            bail!("approval_timeout must be at least one second");
        }
        if self.socket_path.as_os_str().is_empty() {
            bail!("socket_path must not be empty");
        }
        Ok(())
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }

    pub fn resolved_log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => AuditLogger::default_directory(),
        }
    }

    pub fn resolved_workdir(&self) -> PathBuf {
        self.workdir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.approval_timeout(), Duration::from_secs(300));
        assert_eq!(config.socket_path, PathBuf::from("/tmp/goalgate.sock"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default()
            .apply(Overrides {
                approval_timeout_secs: Some(5),
                socket_path: Some(PathBuf::from("/tmp/other.sock")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.approval_timeout_secs, 5);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/other.sock"));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::default()
            .apply(Overrides {
                approval_timeout_secs: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("approval_timeout"));
    }
}
