//! Conversation items exchanged with the realtime service.

use serde::{Deserialize, Serialize};

/// A conversation item the gateway injects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    /// Output from a function call
    FunctionCallOutput {
        /// Unique identifier for this item
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// ID matching the function call
        call_id: String,
        /// Output from the function (JSON string)
        output: String,
    },
}

impl ConversationItem {
    /// Create a new function call output
    pub fn function_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            id: None,
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_output_serialization() {
        let item = ConversationItem::function_output("call_123", r#"{"ok":true}"#);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "function_call_output");
        assert_eq!(json["call_id"], "call_123");
        assert_eq!(json["output"], r#"{"ok":true}"#);
        assert!(json.get("id").is_none());
    }
}
