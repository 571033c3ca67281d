//! Control socket server — the operator's way into a running control plane.
//!
//! Listens on a Unix domain socket. Each connection sends JSON-line
//! `ControlRequest`s and gets a `ControlResponse` line back for each one.
//! Decisions may arrive on any connection task; the registry hands them
//! over to the control loop's waiting task.

use crate::approval::{ApprovalRequest, ApprovalStatus, BroadcastNotifier, Verdict};
use crate::control::ControlPlane;
use crate::error::{ApprovalError, ControlError};
use crate::gateway::protocol::{ControlRequest, ControlResponse};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

/// Serves a control plane over a Unix socket.
pub struct GatewayServer {
    socket_path: PathBuf,
    plane: Arc<ControlPlane>,
    /// Source of approval notifications for `watch` connections
    notifier: BroadcastNotifier,
    next_connection: AtomicU64,
}

impl GatewayServer {
    pub fn new(
        socket_path: impl AsRef<Path>,
        plane: Arc<ControlPlane>,
        notifier: BroadcastNotifier,
    ) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            plane,
            notifier,
            next_connection: AtomicU64::new(1),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket and handle connections until the task is aborted.
    pub async fn run(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("Failed to remove stale socket: {}", self.socket_path.display())
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind socket: {}", self.socket_path.display()))?;

        tracing::info!("Control socket listening on {}", self.socket_path.display());

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let plane = self.plane.clone();
                    let notifier = self.notifier.clone();
                    let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(stream, plane, notifier, connection_id).await
                        {
                            tracing::error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    stream: UnixStream,
    plane: Arc<ControlPlane>,
    notifier: BroadcastNotifier,
    connection_id: u64,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let request: ControlRequest = match serde_json::from_str(line.trim()) {
            Ok(req) => req,
            Err(e) => {
                let response = ControlResponse::error(format!("Invalid request JSON: {}", e));
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        if request == ControlRequest::Watch {
            // Subscribe before acknowledging so nothing created after the
            // ack can be missed.
            let rx = notifier.subscribe();
            write_response(&mut writer, &ControlResponse::ok("Watching approvals.")).await?;
            return stream_notifications(reader, writer, rx, &plane, connection_id).await;
        }

        let response = process_request(&request, &plane);
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

/// Push every new approval request to a `watch` client until it hangs up.
async fn stream_notifications<R>(
    mut reader: BufReader<R>,
    mut writer: tokio::net::unix::OwnedWriteHalf,
    mut rx: broadcast::Receiver<ApprovalRequest>,
    plane: &ControlPlane,
    connection_id: u64,
) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut discard = String::new();
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(request) => {
                    if let Err(e) = plane.attach_routing(
                        &request.request_id,
                        &format!("watch:{}", connection_id),
                    ) {
                        tracing::debug!("Could not record routing: {}", e);
                    }
                    write_response(&mut writer, &ControlResponse::approval_required(&request))
                        .await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Watcher {} missed {} notifications", connection_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            read = reader.read_line(&mut discard) => {
                // Anything but EOF from a watcher is ignored.
                if read? == 0 {
                    break;
                }
                discard.clear();
            }
        }
    }
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &ControlResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Apply one request to the control plane.
pub fn process_request(request: &ControlRequest, plane: &ControlPlane) -> ControlResponse {
    match request {
        ControlRequest::Run { goal } => match plane.submit_goal(goal) {
            Ok(()) => ControlResponse::ok("Prompt accepted and queued."),
            Err(ControlError::EmptyGoal) => ControlResponse::error("Usage: run <instruction>"),
            Err(e) => ControlResponse::error(e.to_string()),
        },
        ControlRequest::Status => {
            let status = plane.status();
            ControlResponse::ok(status.render()).with_status(status)
        }
        ControlRequest::Pause => {
            plane.pause();
            ControlResponse::ok("Execution paused.")
        }
        ControlRequest::Resume => {
            plane.resume();
            ControlResponse::ok("Execution resumed.")
        }
        ControlRequest::Stop => {
            plane.stop();
            ControlResponse::ok("Execution stopped.")
        }
        ControlRequest::Pending => {
            let pending = plane.list_pending_approvals();
            ControlResponse::ok(format!("Pending approvals: {}", pending.len()))
                .with_approvals(pending)
        }
        ControlRequest::Get { request_id } => match plane.get_approval_request(request_id) {
            Some(request) => {
                ControlResponse::ok(format!("{}: {}", request.status, request.action_summary))
                    .with_approvals(vec![request])
            }
            None => ControlResponse::error("Approval request not found."),
        },
        ControlRequest::Approve { request_id } => decide(plane, request_id, true),
        ControlRequest::Deny { request_id } => decide(plane, request_id, false),
        // Handled by the connection loop; reaching here means a misuse.
        ControlRequest::Watch => ControlResponse::error("watch must be the first request"),
    }
}

fn decide(plane: &ControlPlane, request_id: &str, approved: bool) -> ControlResponse {
    let Some(request) = plane.get_approval_request(request_id) else {
        return ControlResponse::error("Approval request not found.");
    };
    if request.status != ApprovalStatus::Waiting {
        return ControlResponse::ok(format!("Request already handled: {}", request.status))
            .with_verdict_of(&request);
    }

    match plane.decide_approval(request_id, approved) {
        Ok(verdict) => {
            let label = if verdict.is_approved() {
                "Approved"
            } else if verdict == Verdict::TimedOut {
                "Timed out"
            } else {
                "Denied"
            };
            ControlResponse::ok(format!(
                "{} | ID: {}\nAction: {}\nRisk: {}",
                label, request_id, request.action_summary, request.risk
            ))
            .with_verdict(verdict)
        }
        Err(ControlError::Approval(ApprovalError::NotFound(_))) => {
            ControlResponse::error("Approval request not found.")
        }
        Err(e) => ControlResponse::error(e.to_string()),
    }
}
