//! Control client: talks to a running `goalgate serve` over its socket.
//!
//! Used by the CLI subcommands (`run`, `status`, `approve`, ...) and by the
//! integration tests.

use crate::gateway::protocol::{ControlRequest, ControlResponse};
use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Client for the control socket.
pub struct ControlClient {
    socket_path: PathBuf,
}

impl ControlClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path).with_context(|| {
            format!(
                "Failed to connect to control socket at {}. Is `goalgate serve` running?",
                self.socket_path.display()
            )
        })
    }

    /// Send a request and receive a response (synchronous).
    /// Each call opens a new connection.
    pub fn send(&self, request: &ControlRequest) -> Result<ControlResponse> {
        let mut stream = self.connect()?;
        write_request(&mut stream, request)?;

        let mut reader = BufReader::new(stream);
        read_response(&mut reader)?.context("Control socket closed without a response")
    }

    pub fn run_goal(&self, goal: &str) -> Result<ControlResponse> {
        self.send(&ControlRequest::Run {
            goal: goal.to_string(),
        })
    }

    pub fn status(&self) -> Result<ControlResponse> {
        self.send(&ControlRequest::Status)
    }

    pub fn pause(&self) -> Result<ControlResponse> {
        self.send(&ControlRequest::Pause)
    }

    pub fn resume(&self) -> Result<ControlResponse> {
        self.send(&ControlRequest::Resume)
    }

    pub fn stop(&self) -> Result<ControlResponse> {
        self.send(&ControlRequest::Stop)
    }

    pub fn pending(&self) -> Result<ControlResponse> {
        self.send(&ControlRequest::Pending)
    }

    pub fn get(&self, request_id: &str) -> Result<ControlResponse> {
        self.send(&ControlRequest::Get {
            request_id: request_id.to_string(),
        })
    }

    pub fn approve(&self, request_id: &str) -> Result<ControlResponse> {
        self.send(&ControlRequest::Approve {
            request_id: request_id.to_string(),
        })
    }

    pub fn deny(&self, request_id: &str) -> Result<ControlResponse> {
        self.send(&ControlRequest::Deny {
            request_id: request_id.to_string(),
        })
    }

    /// Stream approval notifications. `on_event` gets every line after the
    /// acknowledgement; returning false ends the watch.
    pub fn watch<F>(&self, mut on_event: F) -> Result<()>
    where
        F: FnMut(ControlResponse) -> bool,
    {
        let mut stream = self.connect()?;
        write_request(&mut stream, &ControlRequest::Watch)?;
        let mut reader = BufReader::new(stream);

        match read_response(&mut reader)? {
            Some(ack) if ack.ok => {}
            Some(ack) => bail!(
                "Watch rejected: {}",
                ack.error.unwrap_or_else(|| "unknown error".to_string())
            ),
            None => bail!("Control socket closed before acknowledging watch"),
        }

        while let Some(event) = read_response(&mut reader)? {
            if !on_event(event) {
                break;
            }
        }
        Ok(())
    }
}

fn write_request(stream: &mut UnixStream, request: &ControlRequest) -> Result<()> {
    let json = serde_json::to_string(request)?;
    stream.write_all(json.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}

/// Read one response line; `None` at EOF.
fn read_response(reader: &mut BufReader<UnixStream>) -> Result<Option<ControlResponse>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let response =
        serde_json::from_str(line.trim()).context("Failed to parse control response")?;
    Ok(Some(response))
}
