//! `goalgate log` — browse the approval audit trail.
//!
//! Shows every approval a session asked for and how each one ended.

use crate::audit::{AuditEvent, AuditReader, LogFilter};
use crate::goal::Risk;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

/// Run the `goalgate log` command.
pub fn run_log(
    log_dir: &Path,
    session_id: Option<&str>,
    event_filter: Option<&str>,
    risk_filter: Option<&str>,
    limit: Option<usize>,
    summary_only: bool,
) -> Result<()> {
    let reader = AuditReader::new(log_dir);

    let entries = if let Some(sid) = session_id {
        reader
            .read_session(sid)
            .with_context(|| format!("Failed to read session: {}", sid))?
    } else {
        let entries = reader.read_latest_session()?;
        if entries.is_empty() {
            println!();
            println!("  {} No audit logs found in {}.", "ℹ".blue(), log_dir.display());
            println!("  Start a session first:");
            println!("    {}", "goalgate serve".dimmed());
            println!();
            return Ok(());
        }
        entries
    };

    let event = match event_filter {
        Some(text) => match AuditEvent::from_str_loose(text) {
            Some(event) => Some(event),
            None => bail!(
                "Unknown event '{}': expected requested, decided, timed_out or cancelled",
                text
            ),
        },
        None => None,
    };
    let risk = match risk_filter {
        Some(text) => match Risk::from_str_loose(text) {
            Some(risk) => Some(risk),
            None => bail!("Unknown risk '{}': expected low, medium or high", text),
        },
        None => None,
    };

    let filter = LogFilter { event, risk, limit };
    let summary = AuditReader::summarize(&entries);

    println!();
    if summary_only {
        println!("  {} Session: {}", "📋".to_string().bold(), summary.session_id.cyan());
        println!();
        println!(
            "  {} requested | {} approved | {} denied | {} timed out | {} cancelled",
            summary.requested.to_string().bold(),
            summary.approved.to_string().green().bold(),
            summary.denied.to_string().red().bold(),
            summary.timed_out.to_string().yellow().bold(),
            summary.cancelled.to_string().dimmed(),
        );
        if let (Some(start), Some(end)) = (summary.start_time, summary.end_time) {
            println!("  Duration: {}", format_duration((end - start).num_seconds()));
        }
    } else {
        println!("  Session: {}", summary.session_id.cyan());
        println!();
        for entry in AuditReader::filter_entries(&entries, &filter) {
            println!("  {}", AuditReader::format_entry(&entry));
        }
        println!();
        println!("  {} {}", "─".repeat(40).dimmed(), summary.one_line().dimmed());
    }
    println!();

    Ok(())
}

/// List available sessions.
pub fn run_log_list(log_dir: &Path) -> Result<()> {
    let sessions = AuditReader::new(log_dir).list_sessions()?;

    println!();
    if sessions.is_empty() {
        println!("  {} No sessions found.", "ℹ".blue());
        println!();
        return Ok(());
    }

    println!("  {} Available sessions:", "📋".to_string().bold());
    println!();
    for session in &sessions {
        println!("  • {}", session);
    }
    println!();
    println!("  View a session: {}", "goalgate log --session <id>".dimmed());
    println!();

    Ok(())
}

fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
