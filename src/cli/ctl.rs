//! Operator commands that talk to a running `goalgate serve`:
//! `run`, `status`, `pause`, `resume`, `stop`, `pending`, `approve`,
//! `deny` and `watch`.

use crate::gateway::{ControlClient, ControlResponse};
use anyhow::{bail, Result};
use colored::Colorize;

/// List pending approvals.
pub fn run_pending(client: &ControlClient) -> Result<()> {
    let response = client.pending()?;
    if !response.ok {
        return report(&response);
    }

    let approvals = response.approvals.unwrap_or_default();
    println!();
    if approvals.is_empty() {
        println!("  {} No approvals pending.", "ℹ".blue());
    } else {
        for request in &approvals {
            println!(
                "  {} [{}] {}",
                request.request_id.cyan(),
                request.risk.to_string().yellow(),
                request.action_summary
            );
        }
    }
    println!();
    Ok(())
}

/// Follow approval requests as they are raised. Runs until the server
/// closes the connection.
pub fn run_watch(client: &ControlClient) -> Result<()> {
    println!();
    println!(
        "  {} Watching {} for approval requests (Ctrl-C to quit)",
        "👁".to_string().bold(),
        client.socket_path().display().to_string().dimmed()
    );
    println!();

    client.watch(|event| {
        if let Some(message) = event.message.as_deref() {
            for line in message.lines() {
                println!("  {}", line);
            }
            println!();
        }
        true
    })
}

/// Print a reply; a failed one becomes the command's error.
pub fn report(response: &ControlResponse) -> Result<()> {
    if !response.ok {
        bail!(
            "{}",
            response
                .error
                .clone()
                .unwrap_or_else(|| "Request failed".to_string())
        );
    }

    println!();
    if let Some(message) = response.message.as_deref() {
        let mut lines = message.lines();
        if let Some(first) = lines.next() {
            println!("  {} {}", "✓".green().bold(), first);
        }
        for line in lines {
            println!("    {}", line);
        }
    }
    println!();
    Ok(())
}
