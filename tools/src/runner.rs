//! Tool runner seam.
//!
//! Concrete tool implementations live outside this crate; the orchestrator
//! only sees this single-method interface.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolRunnerError {
    pub message: String,
}

impl ToolRunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, tool_name: &str, args: Value) -> Result<Value, ToolRunnerError>;
}

/// Echoes the call back as a successful result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubToolRunner;

#[async_trait]
impl ToolRunner for StubToolRunner {
    async fn run(&self, tool_name: &str, args: Value) -> Result<Value, ToolRunnerError> {
        Ok(json!({
            "success": true,
            "status": "stub",
            "tool": tool_name,
            "args": args,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_echoes_args() {
        let out = StubToolRunner
            .run("search_database", json!({"table": "profiles"}))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["tool"], "search_database");
        assert_eq!(out["args"]["table"], "profiles");
    }
}
