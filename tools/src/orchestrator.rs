//! Tool execution pipeline.
//!
//! `execute_tool` short-circuits through five steps:
//!
//! 1. authorize against the kernel (denials never touch the ledger)
//! 2. acquire the idempotency key (duplicates return the prior result)
//! 3. run the tool
//! 4. validate the output contract
//! 5. commit
//!
//! Failures in steps 3 and 4 roll the key back so a retry may re-attempt.

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Instant};

use device_auth::{AuthorizationKernel, DeviceProfile};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    audit::{AuditLog, DecisionResult},
    error::ExecutionError,
    ledger::{AcquireOutcome, IdempotencyStore, InMemoryLedger},
    metrics::PipelineMetrics,
    runner::{StubToolRunner, ToolRunner},
    validator::OutputValidator,
};

/// One tool call to run on behalf of a device.
#[derive(Debug, Clone)]
pub struct ToolExecutionInput {
    pub tool_name: String,
    pub args: Value,
    pub device: Arc<DeviceProfile>,
    pub idempotency_key: String,
    pub call_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExecutionResult {
    pub success: bool,
    pub call_id: String,
    /// Tool output; `None` on failure or while a duplicate is still in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolExecutionResult {
    pub fn succeeded(call_id: impl Into<String>, output: Option<Value>) -> Self {
        Self {
            success: true,
            call_id: call_id.into(),
            output,
            error: None,
        }
    }

    pub fn failed(call_id: impl Into<String>, error: &ExecutionError) -> Self {
        Self {
            success: false,
            call_id: call_id.into(),
            output: None,
            error: Some(error.to_string()),
        }
    }
}

pub struct Orchestrator {
    kernel: Arc<AuthorizationKernel>,
    ledger: Arc<dyn IdempotencyStore>,
    runner: Arc<dyn ToolRunner>,
    validator: OutputValidator,
    audit: Arc<AuditLog>,
    metrics: Arc<PipelineMetrics>,
}

impl Orchestrator {
    pub fn new(
        kernel: Arc<AuthorizationKernel>,
        ledger: Arc<dyn IdempotencyStore>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            kernel,
            ledger,
            runner,
            validator: OutputValidator::default(),
            audit: Arc::new(AuditLog::new()),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Default kernel, fresh in-memory ledger, stub runner.
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(AuthorizationKernel::default()),
            Arc::new(InMemoryLedger::new()),
            Arc::new(StubToolRunner),
        )
    }

    pub fn with_validator(mut self, validator: OutputValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn kernel(&self) -> &Arc<AuthorizationKernel> {
        &self.kernel
    }

    pub fn ledger(&self) -> &Arc<dyn IdempotencyStore> {
        &self.ledger
    }

    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Run one call through the pipeline.
    ///
    /// A ledger `reset()` while the runner is executing is the only way the
    /// final commit can find no pending record. The output is still returned
    /// as a success, but it is not recorded, so a replay runs the tool again.
    pub async fn execute_tool(&self, input: ToolExecutionInput) -> ToolExecutionResult {
        let start = Instant::now();
        self.metrics.record_execution();
        let ToolExecutionInput {
            tool_name,
            args,
            device,
            idempotency_key,
            call_id,
        } = input;

        let result = self
            .run_pipeline(&tool_name, args, &device, &idempotency_key, &call_id)
            .await;
        self.metrics.record_outcome(result.success);

        debug!(
            tool = %tool_name,
            call_id = %call_id,
            device_id = %device.device_id(),
            success = result.success,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool execution finished"
        );
        result
    }

    async fn run_pipeline(
        &self,
        tool_name: &str,
        args: Value,
        device: &DeviceProfile,
        key: &str,
        call_id: &str,
    ) -> ToolExecutionResult {
        // 1. Authorize
        let allowed = self.kernel.validate_access(tool_name, device);
        let decision = if allowed {
            DecisionResult::Allowed
        } else {
            DecisionResult::Denied
        };
        self.audit.record_decision(device, tool_name, call_id, decision);
        if !allowed {
            self.metrics.record_access_denied();
            warn!(
                tool = %tool_name,
                device_id = %device.device_id(),
                trust_tier = %device.trust_tier(),
                required_tier = %self.kernel.required_tier(tool_name),
                "Tool access denied"
            );
            return ToolExecutionResult::failed(
                call_id,
                &ExecutionError::AccessDenied(tool_name.to_string()),
            );
        }

        // 2. Deduplicate
        match self.ledger.acquire(key).await {
            Ok(AcquireOutcome::Acquired) => {}
            Ok(AcquireOutcome::Existing(record)) => {
                self.metrics.record_duplicate();
                info!(
                    tool = %tool_name,
                    call_id = %call_id,
                    state = ?record.state,
                    "Duplicate tool call suppressed"
                );
                return ToolExecutionResult::succeeded(call_id, record.result);
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Idempotency acquire failed");
                return ToolExecutionResult::failed(call_id, &store_unavailable());
            }
        }

        // 3. Execute
        let output = match AssertUnwindSafe(self.runner.run(tool_name, args))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                self.metrics.record_runner_failure();
                warn!(tool = %tool_name, call_id = %call_id, error = %e, "Tool runner failed");
                self.rollback(key).await;
                return ToolExecutionResult::failed(call_id, &ExecutionError::Runner(e.message));
            }
            Err(panic) => {
                self.metrics.record_runner_failure();
                let message = panic_message(panic.as_ref());
                warn!(tool = %tool_name, call_id = %call_id, error = %message, "Tool runner panicked");
                self.rollback(key).await;
                return ToolExecutionResult::failed(
                    call_id,
                    &ExecutionError::Runner(RUNNER_PANICKED.to_string()),
                );
            }
        };

        // 4. Validate
        let outcome = self.validator.validate(tool_name, &output);
        if !outcome.valid {
            self.metrics.record_validation_failure();
            let reason = outcome
                .reason
                .unwrap_or_else(|| "output rejected".to_string());
            warn!(tool = %tool_name, call_id = %call_id, reason = %reason, "Tool output rejected");
            self.rollback(key).await;
            return ToolExecutionResult::failed(call_id, &ExecutionError::Validation(reason));
        }

        // 5. Commit
        match self.ledger.commit(key, output.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(call_id = %call_id, "Idempotency record vanished before commit");
            }
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Idempotency commit failed");
                self.rollback(key).await;
                return ToolExecutionResult::failed(call_id, &store_unavailable());
            }
        }

        ToolExecutionResult::succeeded(call_id, Some(output))
    }

    async fn rollback(&self, key: &str) {
        match self.ledger.rollback(key).await {
            Ok(true) => self.metrics.record_rollback(),
            Ok(false) => debug!("Rollback found no pending record"),
            Err(e) => warn!(error = %e, "Idempotency rollback failed"),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("kernel", &self.kernel)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

const RUNNER_PANICKED: &str = "tool runner failed";

/// Backend detail stays in the logs; callers see a fixed message.
fn store_unavailable() -> ExecutionError {
    ExecutionError::Store("idempotency store unavailable".to_string())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool runner panicked".to_string()
    }
}
