//! `goalgate serve` — run the control plane.
//!
//! 1. Load the config and apply overrides
//! 2. Open the session's audit log
//! 3. Wire registry, gate, controller and planner into a `ControlPlane`
//! 4. Serve the control socket in the background
//! 5. Run the control loop until someone stops it (or Ctrl-C)
//! 6. Print the session summary

use crate::approval::{ApprovalGate, ApprovalRegistry, BroadcastNotifier};
use crate::audit::{AuditLogger, AuditReader};
use crate::config::{load_config, Config, Overrides};
use crate::control::ControlPlane;
use crate::execution::{ExecutionController, ShellRunner};
use crate::gateway::GatewayServer;
use crate::goal::PrefixPlanner;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for the `goalgate serve` command.
#[derive(Debug, Default)]
pub struct ServeOptions {
    /// Explicit config file (default: nearest goalgate.yaml)
    pub config_path: Option<PathBuf>,
    pub overrides: Overrides,
    /// Session ID override (default: auto-generated UUID)
    pub session_id: Option<String>,
}

/// Run the `goalgate serve` command.
pub async fn run_serve(options: ServeOptions) -> Result<()> {
    let config = load_config(options.config_path.as_deref())?
        .apply(options.overrides)
        .context("Invalid configuration")?;

    let session_id = options
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let log_dir = config.resolved_log_dir()?;
    let logger = AuditLogger::new(&log_dir, &session_id)?;

    print_banner(&config, &session_id, logger.log_path());

    let notifier = BroadcastNotifier::default();
    let plane = Arc::new(build_plane(&config, &session_id, logger, notifier.clone()));

    let gateway = GatewayServer::new(&config.socket_path, plane.clone(), notifier);
    let gateway_handle = tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            tracing::error!("Gateway error: {:#}", e);
        }
    });

    let interrupt_plane = plane.clone();
    let interrupt_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping");
            interrupt_plane.stop();
        }
    });

    plane.run().await;

    interrupt_handle.abort();
    gateway_handle.abort();
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    print_session_summary(&log_dir, &session_id)?;
    Ok(())
}

/// Assemble a control plane from config. The notifier feeds `watch`
/// connections on the control socket.
pub fn build_plane(
    config: &Config,
    session_id: &str,
    logger: AuditLogger,
    notifier: BroadcastNotifier,
) -> ControlPlane {
    let registry = ApprovalRegistry::with_notifier(config.approval_timeout(), Arc::new(notifier));
    let gate = ApprovalGate::new(registry).with_audit(session_id, logger);
    let runner = ShellRunner::new(config.resolved_workdir());
    let controller = ExecutionController::new(Arc::new(runner));
    ControlPlane::new(controller, gate, Arc::new(PrefixPlanner))
}

fn print_banner(config: &Config, session_id: &str, log_path: &Path) {
    println!();
    println!(
        "  {} Goalgate v{}",
        "▶".green().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  Session: {}", session_id.get(..8).unwrap_or(session_id).cyan());
    println!("  Socket:  {}", config.socket_path.display().to_string().dimmed());
    println!("  Log:     {}", log_path.display().to_string().dimmed());
    println!("  Timeout: {}s per approval", config.approval_timeout_secs);
    println!();
    println!(
        "  {}",
        "Send goals with `goalgate run <instruction>`, decide with `goalgate approve <id>`."
            .dimmed()
    );
    println!();
}

fn print_session_summary(log_dir: &Path, session_id: &str) -> Result<()> {
    let reader = AuditReader::new(log_dir);
    let entries = match reader.read_session(session_id) {
        Ok(entries) => entries,
        // Nothing was ever requested, so the log may not have content.
        Err(_) => Vec::new(),
    };

    let summary = AuditReader::summarize(&entries);
    println!();
    println!("  {} Session ended", "■".bold());
    println!("  {}", summary.one_line().dimmed());
    println!();
    Ok(())
}
