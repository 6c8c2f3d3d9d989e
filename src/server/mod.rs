//! Server Assembly
//!
//! Everything that turns the core subsystems into a running process:
//! configuration, shared application state, initialization, and the
//! WebSocket transport glue.

pub mod config;
pub mod init;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use state::{AppState, ChannelRegistry};
