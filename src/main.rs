//! Goalgate — supervised task execution.
//!
//! Quick start:
//!   goalgate serve                      # start the control plane
//!   goalgate run "cmd: ls -la"          # give it a goal
//!   goalgate pending                    # see what is waiting for you
//!   goalgate approve <id>               # let it happen
//!
//! For more info: goalgate --help

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use goalgate::cli;
use goalgate::config::{load_config, Overrides};
use goalgate::gateway::ControlClient;
use std::path::{Path, PathBuf};

/// Goalgate: every action a goal produces waits for your approval.
#[derive(Parser)]
#[command(
    name = "goalgate",
    version,
    about = "Supervised task execution with human approval",
    long_about = "Goalgate turns goals into actions and holds every action until\n\
                  a human approves it. Goals can be replaced, paused and stopped\n\
                  at any time.\n\n\
                  Quick start:\n  \
                  goalgate serve               # start the control plane\n  \
                  goalgate run \"cmd: ls\"       # submit a goal\n  \
                  goalgate approve <id>        # approve the pending action"
)]
struct Cli {
    /// Control socket (default: from goalgate.yaml, else /tmp/goalgate.sock)
    #[arg(long, global = true, env = "GOALGATE_SOCKET")]
    socket: Option<PathBuf>,

    /// Config file (default: nearest goalgate.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control plane and serve the control socket
    Serve {
        /// Seconds an approval waits before timing out
        #[arg(long, env = "APPROVAL_TIMEOUT_SECONDS")]
        approval_timeout: Option<u64>,

        /// Where audit logs go
        #[arg(long, env = "GOALGATE_LOG_DIR")]
        log_dir: Option<PathBuf>,

        /// Working directory for approved commands
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Session ID (default: random UUID)
        #[arg(long)]
        session: Option<String>,
    },

    /// Submit a goal, replacing whatever is running
    Run {
        /// The instruction; prefix with `cmd:` to run a shell command
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },

    /// Show what the control plane is doing
    Status,

    /// Hold new actions until `resume`
    Pause,

    /// Let held actions continue
    Resume,

    /// Stop for good: deny everything outstanding and shut down
    Stop,

    /// List approvals waiting for a decision
    Pending,

    /// Show one approval request
    Get { request_id: String },

    /// Approve a pending action
    Approve { request_id: String },

    /// Deny a pending action
    Deny { request_id: String },

    /// Follow approval requests as they appear
    Watch,

    /// See what was approved, denied or timed out
    Log {
        /// Show a specific session
        #[arg(short, long, help = "Session ID to view")]
        session: Option<String>,

        /// Filter by event
        #[arg(
            short,
            long,
            help = "Filter: requested, decided, timed_out, cancelled"
        )]
        event: Option<String>,

        /// Filter by risk
        #[arg(short, long, help = "Filter: low, medium, high")]
        risk: Option<String>,

        /// Limit number of entries shown
        #[arg(short, long, help = "Max entries to show")]
        limit: Option<usize>,

        /// Show only the summary
        #[arg(long, help = "Show only the session summary")]
        summary: bool,

        /// List all available sessions
        #[arg(long, help = "List all recorded sessions")]
        list: bool,

        /// Log directory (default: from config, else ~/.goalgate/logs)
        #[arg(long, env = "GOALGATE_LOG_DIR")]
        log_dir: Option<PathBuf>,
    },

    /// Validate a config file
    CheckConfig {
        /// Path to the config file (default: nearest goalgate.yaml)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("goalgate=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = dispatch(Cli::parse()).await;

    if let Err(e) = result {
        eprintln!();
        eprintln!("  {} {}", "✗".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}

async fn dispatch(args: Cli) -> Result<()> {
    let Cli {
        socket,
        config,
        command,
    } = args;

    match command {
        Commands::Serve {
            approval_timeout,
            log_dir,
            workdir,
            session,
        } => {
            let options = cli::serve::ServeOptions {
                config_path: config,
                overrides: Overrides {
                    approval_timeout_secs: approval_timeout,
                    log_dir,
                    socket_path: socket,
                    workdir,
                },
                session_id: session,
            };
            cli::serve::run_serve(options).await
        }

        Commands::Log {
            session,
            event,
            risk,
            limit,
            summary,
            list,
            log_dir,
        } => {
            let log_dir = match log_dir {
                Some(dir) => dir,
                None => load_config(config.as_deref())?.resolved_log_dir()?,
            };
            if list {
                cli::log::run_log_list(&log_dir)
            } else {
                cli::log::run_log(
                    &log_dir,
                    session.as_deref(),
                    event.as_deref(),
                    risk.as_deref(),
                    limit,
                    summary,
                )
            }
        }

        Commands::CheckConfig { path } => {
            cli::check::run_check(path.as_deref().or(config.as_deref()))
        }

        Commands::Pending => cli::ctl::run_pending(&client(socket, config.as_deref())?),

        Commands::Watch => cli::ctl::run_watch(&client(socket, config.as_deref())?),

        Commands::Run { goal } => {
            let reply = client(socket, config.as_deref())?.run_goal(&goal.join(" "))?;
            cli::ctl::report(&reply)
        }
        Commands::Status => cli::ctl::report(&client(socket, config.as_deref())?.status()?),
        Commands::Pause => cli::ctl::report(&client(socket, config.as_deref())?.pause()?),
        Commands::Resume => cli::ctl::report(&client(socket, config.as_deref())?.resume()?),
        Commands::Stop => cli::ctl::report(&client(socket, config.as_deref())?.stop()?),
        Commands::Get { request_id } => {
            cli::ctl::report(&client(socket, config.as_deref())?.get(&request_id)?)
        }
        Commands::Approve { request_id } => {
            cli::ctl::report(&client(socket, config.as_deref())?.approve(&request_id)?)
        }
        Commands::Deny { request_id } => {
            cli::ctl::report(&client(socket, config.as_deref())?.deny(&request_id)?)
        }
    }
}

/// The socket from `--socket`/GOALGATE_SOCKET, else from the config file.
fn client(socket: Option<PathBuf>, config: Option<&Path>) -> Result<ControlClient> {
    let socket = match socket {
        Some(path) => path,
        None => load_config(config)?.socket_path,
    };
    Ok(ControlClient::new(socket))
}
