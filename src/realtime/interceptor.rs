//! Tool-call interception on upstream traffic.
//!
//! Inspection never alters what is forwarded: the raw event always reaches
//! the device, whether or not a call was extracted from it.

use realtime_protocol::{ConversationItem, FunctionCallEvent, RealtimeClientEvent};
use serde_json::{json, Map, Value};
use tool_pipeline::{idempotency_key, ToolExecutionResult};

use crate::error::ErrorPayload;

/// A completed function call extracted from one upstream event.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub tool_name: String,
    /// Always a JSON object
    pub args: Value,
    pub call_id: String,
    pub idempotency_key: String,
}

/// Extract a completed function call, or `None` when the event is not one.
///
/// Missing name or call id is "no call", not an error. Arguments that are
/// not a JSON object (malformed, or some other JSON value) become `{}`.
pub fn parse_tool_call(event: &Value, device_id: &str) -> Option<ToolCallRequest> {
    if event.get("type").and_then(Value::as_str) != Some(FunctionCallEvent::ARGUMENTS_DONE) {
        return None;
    }

    let tool_name = string_field(event, "name")?;
    let call_id = string_field(event, "call_id")?;

    Some(ToolCallRequest {
        args: parse_arguments(event.get("arguments")),
        idempotency_key: idempotency_key(device_id, &call_id),
        tool_name,
        call_id,
    })
}

/// Top-level field, falling back to the same field under `item`.
fn string_field(event: &Value, field: &str) -> Option<String> {
    event
        .get(field)
        .and_then(Value::as_str)
        .or_else(|| event.pointer(&format!("/item/{field}")).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_arguments(raw: Option<&Value>) -> Value {
    let parsed = match raw {
        Some(Value::String(s)) => serde_json::from_str::<Value>(s).ok(),
        Some(Value::Object(map)) => Some(Value::Object(map.clone())),
        _ => None,
    };
    match parsed {
        Some(Value::Object(map)) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

/// Text placed in the `output` field of the injected conversation item.
pub fn result_output(result: &ToolExecutionResult) -> String {
    if result.success {
        let output = result
            .output
            .clone()
            .unwrap_or_else(|| json!({"status": "in_progress"}));
        return output.to_string();
    }

    let message = result.error.as_deref().unwrap_or("Tool execution failed");
    serde_json::to_string(&ErrorPayload::new(message))
        .unwrap_or_else(|_| json!({"error": message}).to_string())
}

/// The two upstream messages that deliver a result: the function output
/// item, then a request for the model to continue.
pub fn result_events(result: &ToolExecutionResult) -> [RealtimeClientEvent; 2] {
    [
        RealtimeClientEvent::item_create(ConversationItem::function_output(
            result.call_id.clone(),
            result_output(result),
        )),
        RealtimeClientEvent::response_create(),
    ]
}

#[cfg(test)]
mod tests {
    use tool_pipeline::ExecutionError;

    use super::*;

    fn done_event(args: Value) -> Value {
        json!({
            "type": "response.function_call_arguments.done",
            "event_id": "evt_1",
            "response_id": "resp_1",
            "item_id": "item_1",
            "output_index": 0,
            "call_id": "call_abc",
            "name": "search_database",
            "arguments": args,
        })
    }

    #[test]
    fn test_non_completion_event_is_no_call() {
        let event = json!({"type": "response.function_call_arguments.delta", "call_id": "c", "name": "n"});
        assert!(parse_tool_call(&event, "dev").is_none());
        assert!(parse_tool_call(&json!({"type": "session.created"}), "dev").is_none());
        assert!(parse_tool_call(&json!("just a string"), "dev").is_none());
    }

    #[test]
    fn test_extracts_call() {
        let call = parse_tool_call(&done_event(json!("{\"table\":\"profiles\"}")), "dev").unwrap();
        assert_eq!(call.tool_name, "search_database");
        assert_eq!(call.call_id, "call_abc");
        assert_eq!(call.args, json!({"table": "profiles"}));
        assert_eq!(call.idempotency_key, idempotency_key("dev", "call_abc"));
    }

    #[test]
    fn test_malformed_arguments_become_empty_object() {
        for raw in [json!("{not json"), json!("[1,2]"), json!("42"), Value::Null, json!(7)] {
            let call = parse_tool_call(&done_event(raw), "dev").unwrap();
            assert_eq!(call.args, json!({}));
        }
    }

    #[test]
    fn test_nested_call_id_fallback() {
        let event = json!({
            "type": "response.function_call_arguments.done",
            "item": {"call_id": "call_nested", "name": "get_device_status"},
            "arguments": "{}"
        });
        let call = parse_tool_call(&event, "dev").unwrap();
        assert_eq!(call.call_id, "call_nested");
        assert_eq!(call.tool_name, "get_device_status");
    }

    #[test]
    fn test_missing_name_or_call_id_is_no_call() {
        let event = json!({"type": "response.function_call_arguments.done", "call_id": "c", "arguments": "{}"});
        assert!(parse_tool_call(&event, "dev").is_none());

        let event = json!({"type": "response.function_call_arguments.done", "name": "n", "call_id": ""});
        assert!(parse_tool_call(&event, "dev").is_none());
    }

    #[test]
    fn test_result_events_pair() {
        let result = ToolExecutionResult::succeeded("call_1", Some(json!({"success": true})));
        let [item, resume] = result_events(&result);

        let item = serde_json::to_value(&item).unwrap();
        assert_eq!(item["type"], "conversation.item.create");
        assert_eq!(item["item"]["type"], "function_call_output");
        assert_eq!(item["item"]["call_id"], "call_1");
        assert_eq!(item["item"]["output"], "{\"success\":true}");

        assert_eq!(serde_json::to_value(&resume).unwrap(), json!({"type": "response.create"}));
    }

    #[test]
    fn test_failure_output_is_error_payload() {
        let result = ToolExecutionResult::failed(
            "call_2",
            &ExecutionError::AccessDenied("delete_record".to_string()),
        );
        let output: Value = serde_json::from_str(&result_output(&result)).unwrap();
        assert_eq!(output["error"], "Access denied for tool 'delete_record'");
        assert!(output["correlationId"].is_string());
        assert!(output["timestamp"].is_string());
    }

    #[test]
    fn test_in_flight_duplicate_output() {
        let result = ToolExecutionResult::succeeded("call_3", None);
        assert_eq!(result_output(&result), "{\"status\":\"in_progress\"}");
    }
}
