//! Execution-layer error taxonomy.
//!
//! None of these close the connection: each becomes a failure result fed
//! back into the live conversation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Access denied for tool '{0}'")]
    AccessDenied(String),

    /// Runner returned an error or panicked.
    #[error("{0}")]
    Runner(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Tool execution timed out after {0}ms")]
    Timeout(u64),

    #[error("Idempotency store error: {0}")]
    Store(String),
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::AccessDenied(_) => "access_denied",
            ExecutionError::Runner(_) => "execution_error",
            ExecutionError::Validation(_) => "validation_error",
            ExecutionError::Timeout(_) => "timeout",
            ExecutionError::Store(_) => "store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ExecutionError::AccessDenied("delete_record".into()).to_string(),
            "Access denied for tool 'delete_record'"
        );
        assert_eq!(
            ExecutionError::Validation("expected object".into()).to_string(),
            "Validation failed: expected object"
        );
        assert_eq!(ExecutionError::Runner("boom".into()).to_string(), "boom");
        assert_eq!(ExecutionError::Timeout(30).kind(), "timeout");
    }
}
