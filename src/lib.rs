//! Authorization-aware tool-call gateway for realtime voice sessions.
//!
//! Devices connect over WebSocket; the gateway authenticates and classifies
//! them, opens an upstream realtime session advertising only the tools the
//! device may use, and executes intercepted function calls through the
//! `tool_pipeline` crate before feeding results back into the conversation.

pub mod config;
pub mod error;
pub mod logging;
pub mod realtime;
pub mod server;

pub use config::{ConfigError, ConfigOverrides, GatewayConfig};
pub use realtime::RealtimeGateway;
pub use server::{build_router, AppState};
