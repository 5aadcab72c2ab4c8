//! Counters for pipeline and connection outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct PipelineMetrics {
    // Execution outcomes
    executions: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,

    // Failure breakdown
    access_denied: AtomicU64,
    duplicates_suppressed: AtomicU64,
    runner_failures: AtomicU64,
    validation_failures: AtomicU64,
    rollbacks: AtomicU64,
    timeouts: AtomicU64,

    // Connections
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
    dropped_device_frames: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, success: bool) {
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_access_denied(&self) {
        self.access_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_runner_failure(&self) {
        self.runner_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_opened(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        // Saturating: a close without a matching open must not wrap.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn record_connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// A device frame was discarded because the outbound queue was full.
    pub fn record_dropped_frame(&self) {
        self.dropped_device_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions: self.executions.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            runner_failures: self.runner_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            dropped_device_frames: self.dropped_device_frames.load(Ordering::Relaxed),
        }
    }

    /// Reset counters; live connection gauge is kept.
    pub fn reset(&self) {
        for counter in [
            &self.executions,
            &self.successes,
            &self.failures,
            &self.access_denied,
            &self.duplicates_suppressed,
            &self.runner_failures,
            &self.validation_failures,
            &self.rollbacks,
            &self.timeouts,
            &self.rejected_connections,
            &self.dropped_device_frames,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub access_denied: u64,
    pub duplicates_suppressed: u64,
    pub runner_failures: u64,
    pub validation_failures: u64,
    pub rollbacks: u64,
    pub timeouts: u64,
    pub active_connections: u64,
    pub rejected_connections: u64,
    pub dropped_device_frames: u64,
}
