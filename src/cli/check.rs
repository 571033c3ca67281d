//! `goalgate check-config` — validate a config file without starting anything.

use crate::config::{load_config, Config};
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run_check(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    print_config(&config, path);
    Ok(())
}

fn print_config(config: &Config, path: Option<&Path>) {
    println!();
    println!("  {} Config is valid!", "✓".green().bold());
    match path {
        Some(path) => println!("  File:             {}", path.display().to_string().dimmed()),
        None => println!("  File:             {}", "(defaults / nearest goalgate.yaml)".dimmed()),
    }
    println!("  Approval timeout: {}s", config.approval_timeout_secs);
    println!("  Socket:           {}", config.socket_path.display());
    match &config.log_dir {
        Some(dir) => println!("  Log dir:          {}", dir.display()),
        None => println!("  Log dir:          {}", "~/.goalgate/logs".dimmed()),
    }
    match &config.workdir {
        Some(dir) => println!("  Workdir:          {}", dir.display()),
        None => println!("  Workdir:          {}", "(current directory)".dimmed()),
    }
    println!();
}
