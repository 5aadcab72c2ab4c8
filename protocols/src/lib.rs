//! Wire types for the upstream realtime conversation protocol.
//!
//! Only the subset the gateway emits or inspects is modelled here. Traffic
//! the gateway merely relays is never decoded into these types.

pub mod event_types;
pub mod realtime;

pub use event_types::FunctionCallEvent;
pub use realtime::{
    AudioFormat, ConversationItem, Modality, RealtimeClientEvent, SessionConfig, ToolChoice,
    ToolDefinition, TurnDetection, Voice,
};
