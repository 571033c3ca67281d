//! YAML config parser.
//!
//! # Example config file:
//! ```yaml
//! approval_timeout: 5m
//! log_dir: ./logs
//! socket_path: /tmp/goalgate.sock
//! workdir: /srv/project
//! ```
//!
//! Every key is optional. `approval_timeout` takes plain seconds (`300`) or a
//! number with an `s`, `m` or `h` suffix.

use crate::config::types::*;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw YAML representation before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    approval_timeout: Option<TimeoutSpec>,
    #[serde(default)]
    log_dir: Option<PathBuf>,
    #[serde(default)]
    socket_path: Option<PathBuf>,
    #[serde(default)]
    workdir: Option<PathBuf>,
}

/// A timeout written either as seconds or as text with a unit suffix:
/// ```yaml
/// approval_timeout: 300    # seconds
/// approval_timeout: 5m     # also five minutes
/// ```
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeoutSpec {
    Seconds(u64),
    Text(String),
}

impl TimeoutSpec {
    fn into_secs(self) -> Result<u64> {
        match self {
            TimeoutSpec::Seconds(secs) => Ok(secs),
            TimeoutSpec::Text(text) => parse_duration_secs(&text),
        }
    }
}

/// Parse "300", "30s", "5m" or "1h" into seconds.
pub fn parse_duration_secs(text: &str) -> Result<u64> {
    let text = text.trim().to_lowercase();
    let (digits, multiplier) = match text.chars().last() {
        Some('s') => (&text[..text.len() - 1], 1),
        Some('m') => (&text[..text.len() - 1], 60),
        Some('h') => (&text[..text.len() - 1], 3600),
        Some(c) if c.is_ascii_digit() => (text.as_str(), 1),
        _ => bail!("Invalid duration '{}': expected e.g. 300, 30s, 5m or 1h", text),
    };
    let value: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration '{}'", text))?;
    value
        .checked_mul(multiplier)
        .with_context(|| format!("Duration '{}' is too large", text))
}

/// Parse a YAML config file from a file path.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a YAML config string. An empty document yields the defaults.
pub fn parse_config_str(yaml: &str) -> Result<Config> {
    let raw: RawConfig = if yaml.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml::from_str(yaml).context("Invalid YAML syntax in config file")?
    };

    let defaults = Config::default();
    let config = Config {
        approval_timeout_secs: match raw.approval_timeout {
            Some(spec) => spec.into_secs().context("Invalid approval_timeout")?,
            None => defaults.approval_timeout_secs,
        },
        log_dir: raw.log_dir,
        socket_path: raw.socket_path.unwrap_or(defaults.socket_path),
        workdir: raw.workdir,
    };
    config.validate()?;
    Ok(config)
}

/// Find `goalgate.yaml` walking up from `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load the config: the explicit file if given, else the nearest
/// `goalgate.yaml`, else the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return parse_config_file(path);
    }
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    match find_config_file(&cwd) {
        Some(path) => {
            tracing::debug!("Using config file {}", path.display());
            parse_config_file(&path)
        }
        None => Ok(Config::default()),
    }
}
