//! Realtime gateway.
//!
//! A device connects over WebSocket, is authenticated before the upgrade,
//! and is then relayed to an upstream realtime session opened on its behalf.
//! Completed function calls on the upstream side are executed through the
//! tool pipeline and their results injected back into the conversation.

pub mod connection;
pub mod gateway;
pub mod interceptor;
pub mod registry;
pub mod transport;
pub mod upstream;

pub use connection::{ConnectionState, OutboundQueue};
pub use gateway::{CloseReason, RealtimeGateway};
pub use interceptor::{parse_tool_call, result_events, result_output, ToolCallRequest};
pub use registry::{ConnectionEntry, ConnectionPhase, ConnectionRegistry};
pub use transport::{Frame, FrameSink, FrameStream, RelayError, Transport};
