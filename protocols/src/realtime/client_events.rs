//! Client events the gateway originates upstream: `session.update` when a
//! device connects, and the `conversation.item.create` / `response.create`
//! pair answering a completed function call. Device traffic is relayed as
//! raw frames and never decoded into these types.

use serde::{Deserialize, Serialize};

use super::{conversation::ConversationItem, session::SessionConfig};

// ============================================================================
// Client Event Enum
// ============================================================================

/// Client events understood by the realtime service.
///
/// Each event has an optional `event_id` that can be used for tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RealtimeClientEvent {
    /// Update the session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        session: SessionConfig,
    },

    /// Create a new conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
        /// ID of the item to insert after (None for end of conversation)
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_item_id: Option<String>,
        item: ConversationItem,
    },

    /// Trigger the model to generate a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_id: Option<String>,
    },
}

impl RealtimeClientEvent {
    /// Create a session update event
    pub fn session_update(session: SessionConfig) -> Self {
        Self::SessionUpdate {
            event_id: None,
            session,
        }
    }

    /// Create a conversation item create event
    pub fn item_create(item: ConversationItem) -> Self {
        Self::ConversationItemCreate {
            event_id: None,
            previous_item_id: None,
            item,
        }
    }

    /// Create a response create event with default config
    pub fn response_create() -> Self {
        Self::ResponseCreate { event_id: None }
    }

    /// Serialize to the JSON text frame sent over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
