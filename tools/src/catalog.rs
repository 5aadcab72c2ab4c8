//! Static catalog of invocable tools.

use realtime_protocol::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool a device may see and request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Upstream function-declaration form.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(&self.name, &self.description, self.parameters.clone())
    }
}

impl From<&ToolDescriptor> for ToolDefinition {
    fn from(descriptor: &ToolDescriptor) -> Self {
        descriptor.to_definition()
    }
}

/// Read-only, ordered list of tool descriptors.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        Self { tools }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            ToolDescriptor::new(
                "get_device_status",
                "Report the connection and battery status of the calling device.",
                json!({"type": "object", "properties": {}}),
            ),
            ToolDescriptor::new(
                "search_database",
                "Search a table for records matching an optional text query.",
                json!({
                    "type": "object",
                    "properties": {
                        "table": {"type": "string", "description": "Table to search"},
                        "query": {"type": "string", "description": "Free-text filter"},
                        "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                    },
                    "required": ["table"]
                }),
            ),
            ToolDescriptor::new(
                "send_email",
                "Send an email to a single recipient.",
                json!({
                    "type": "object",
                    "properties": {
                        "to": {"type": "string", "format": "email"},
                        "subject": {"type": "string"},
                        "body": {"type": "string"}
                    },
                    "required": ["to", "subject", "body"]
                }),
            ),
            ToolDescriptor::new(
                "trigger_webhook",
                "Fire a pre-registered outbound webhook by name.",
                json!({
                    "type": "object",
                    "properties": {
                        "hook": {"type": "string"},
                        "payload": {"type": "object"}
                    },
                    "required": ["hook"]
                }),
            ),
            ToolDescriptor::new(
                "create_record",
                "Insert a record into a table.",
                json!({
                    "type": "object",
                    "properties": {
                        "table": {"type": "string"},
                        "fields": {"type": "object"}
                    },
                    "required": ["table", "fields"]
                }),
            ),
            ToolDescriptor::new(
                "delete_record",
                "Permanently delete a record by id.",
                json!({
                    "type": "object",
                    "properties": {
                        "table": {"type": "string"},
                        "id": {"type": "string"}
                    },
                    "required": ["table", "id"]
                }),
            ),
        ])
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
