//! Realtime conversation protocol types.
//!
//! The gateway speaks the beta realtime dialect over a WebSocket: it sends a
//! `session.update` when a device connects, and answers completed function
//! calls with a `conversation.item.create` / `response.create` pair.
//!
//! # Event Types
//!
//! ## Client Events (sent upstream by the gateway)
//!
//! | Event Type | Description |
//! |------------|-------------|
//! | `session.update` | Configure modalities, voice, audio formats, VAD and tools |
//! | `conversation.item.create` | Inject a function call output |
//! | `response.create` | Ask the model to continue |
//!
//! ## Server Events (inspected by the gateway)
//!
//! Only `response.function_call_arguments.done` is interpreted; see
//! [`crate::FunctionCallEvent`]. Everything else is relayed untouched.

pub mod client_events;
pub mod conversation;
pub mod session;

pub use client_events::RealtimeClientEvent;
pub use conversation::ConversationItem;
pub use session::{
    AudioFormat, Modality, SessionConfig, ToolChoice, ToolDefinition, TurnDetection, Voice,
};
