//! Tool-call execution pipeline.
//!
//! ## Modules
//!
//! - [`catalog`] / [`manifest`]: the fixed tool catalog and per-device filtering
//! - [`ledger`]: idempotency records giving at-most-once execution per key
//! - [`validator`]: per-tool output contracts
//! - [`runner`]: the pluggable tool runner seam
//! - [`orchestrator`]: authorize → dedup → execute → validate → commit
//!
//! ## Shared Types
//!
//! - [`AuditLog`]: authorization decisions taken at execution time
//! - [`PipelineMetrics`]: counters for every pipeline outcome

pub mod audit;
pub mod catalog;
pub mod error;
pub mod ledger;
pub mod manifest;
pub mod metrics;
pub mod orchestrator;
pub mod runner;
pub mod validator;

pub use audit::{AuditEntry, AuditLog, DecisionResult};
pub use catalog::{ToolCatalog, ToolDescriptor};
pub use error::ExecutionError;
pub use ledger::{
    idempotency_key, AcquireOutcome, IdempotencyRecord, IdempotencyStore, InMemoryLedger,
    LedgerError, RecordState,
};
pub use manifest::{ManifestMeta, ToolManifest, ToolManifestFilter};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use orchestrator::{Orchestrator, ToolExecutionInput, ToolExecutionResult};
pub use runner::{StubToolRunner, ToolRunner, ToolRunnerError};
pub use validator::{OutputContract, OutputValidator, ValidationOutcome};
