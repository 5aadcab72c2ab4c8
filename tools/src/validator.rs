//! Per-tool output contracts.
//!
//! Tools missing from the contract table pass (open-world). This is the
//! opposite of the authorization kernel, which denies unregistered tools
//! below OPERATOR.

use std::collections::HashMap;

use serde_json::Value;

/// Shape a tool's raw result must have. Every contract first requires a
/// JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputContract {
    RequiresField(String),
    /// Boolean `success` field.
    RequiresSuccessFlag,
    /// Either an `id` field or a boolean `success` field.
    RequiresIdOrSuccess,
}

impl OutputContract {
    pub fn check(&self, output: &Value) -> Result<(), String> {
        let Some(object) = output.as_object() else {
            return Err(format!("expected a JSON object, got {}", kind_of(output)));
        };
        let has_success_flag = object.get("success").is_some_and(Value::is_boolean);

        match self {
            OutputContract::RequiresField(field) => {
                if object.contains_key(field) {
                    Ok(())
                } else {
                    Err(format!("missing required field '{field}'"))
                }
            }
            OutputContract::RequiresSuccessFlag => {
                if has_success_flag {
                    Ok(())
                } else {
                    Err("missing boolean 'success' field".to_string())
                }
            }
            OutputContract::RequiresIdOrSuccess => {
                if object.contains_key("id") || has_success_flag {
                    Ok(())
                } else {
                    Err("expected an 'id' or boolean 'success' field".to_string())
                }
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationOutcome {
    fn pass() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn fail(reason: String) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputValidator {
    contracts: HashMap<String, OutputContract>,
}

impl OutputValidator {
    pub fn empty() -> Self {
        Self {
            contracts: HashMap::new(),
        }
    }

    pub fn with_contract(mut self, tool_name: impl Into<String>, contract: OutputContract) -> Self {
        self.contracts.insert(tool_name.into(), contract);
        self
    }

    pub fn contract(&self, tool_name: &str) -> Option<&OutputContract> {
        self.contracts.get(tool_name)
    }

    pub fn validate(&self, tool_name: &str, output: &Value) -> ValidationOutcome {
        match self.contracts.get(tool_name) {
            None => ValidationOutcome::pass(),
            Some(contract) => match contract.check(output) {
                Ok(()) => ValidationOutcome::pass(),
                Err(reason) => ValidationOutcome::fail(reason),
            },
        }
    }
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::empty()
            .with_contract(
                "get_device_status",
                OutputContract::RequiresField("status".to_string()),
            )
            .with_contract("search_database", OutputContract::RequiresSuccessFlag)
            .with_contract("send_email", OutputContract::RequiresSuccessFlag)
            .with_contract("trigger_webhook", OutputContract::RequiresSuccessFlag)
            .with_contract("create_record", OutputContract::RequiresIdOrSuccess)
            .with_contract("delete_record", OutputContract::RequiresIdOrSuccess)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unregistered_tool_passes_anything() {
        let validator = OutputValidator::default();
        assert!(validator.validate("custom_tool", &json!("plain string")).valid);
        assert!(validator.validate("custom_tool", &Value::Null).valid);
    }

    #[test]
    fn test_non_objects_fail_every_contract() {
        let validator = OutputValidator::default();
        for tool in ["get_device_status", "send_email", "create_record"] {
            for value in [Value::Null, json!(1), json!("not-an-object"), json!([true])] {
                let outcome = validator.validate(tool, &value);
                assert!(!outcome.valid, "{tool} accepted {value}");
                assert!(outcome.reason.unwrap().starts_with("expected a JSON object"));
            }
        }
    }

    #[test]
    fn test_success_flag_must_be_boolean() {
        let validator = OutputValidator::default();
        assert!(validator.validate("send_email", &json!({"success": false})).valid);
        assert!(!validator.validate("send_email", &json!({"success": "yes"})).valid);
        assert!(!validator.validate("send_email", &json!({"sent": true})).valid);
    }

    #[test]
    fn test_id_or_success() {
        let validator = OutputValidator::default();
        assert!(validator.validate("create_record", &json!({"id": "r1"})).valid);
        assert!(validator.validate("delete_record", &json!({"success": true})).valid);
        let outcome = validator.validate("create_record", &json!({"table": "t"}));
        assert!(!outcome.valid);
        assert!(outcome.reason.is_some());
    }

    #[test]
    fn test_required_field() {
        let validator = OutputValidator::default();
        assert!(validator.validate("get_device_status", &json!({"status": "online"})).valid);
        let outcome = validator.validate("get_device_status", &json!({}));
        assert_eq!(outcome.reason.as_deref(), Some("missing required field 'status'"));
    }
}
