pub mod client;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use protocol::{ControlRequest, ControlResponse};
pub use server::GatewayServer;
