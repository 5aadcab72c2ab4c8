//! Audit trail of execution-time authorization decisions.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use device_auth::{DeviceProfile, TrustTier};
use parking_lot::RwLock;
use serde::Serialize;

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionResult {
    Allowed,
    Denied,
}

impl DecisionResult {
    pub fn is_allowed(self) -> bool {
        matches!(self, DecisionResult::Allowed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub connection_id: String,
    pub trust_tier: TrustTier,
    pub tool_name: String,
    pub call_id: String,
    pub result: DecisionResult,
}

impl AuditEntry {
    pub fn new(
        device: &DeviceProfile,
        tool_name: impl Into<String>,
        call_id: impl Into<String>,
        result: DecisionResult,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            device_id: device.device_id().to_string(),
            connection_id: device.connection_id().to_string(),
            trust_tier: device.trust_tier(),
            tool_name: tool_name.into(),
            call_id: call_id.into(),
            result,
        }
    }
}

/// Bounded ring buffer; oldest entries are evicted first.
#[derive(Debug)]
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    max_entries: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(max_entries.min(1024))),
            max_entries,
        }
    }

    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.write();
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn record_decision(
        &self,
        device: &DeviceProfile,
        tool_name: &str,
        call_id: &str,
        result: DecisionResult,
    ) {
        self.record(AuditEntry::new(device, tool_name, call_id, result));
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn for_device(&self, device_id: &str, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .iter()
            .rev()
            .filter(|e| e.device_id == device_id)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceProfile {
        DeviceProfile::new(id, TrustTier::Peripheral, ["voice"], "conn-1")
    }

    #[test]
    fn test_audit_log_record() {
        let log = AuditLog::new();
        log.record_decision(&device("speaker"), "delete_record", "call-1", DecisionResult::Denied);

        assert_eq!(log.len(), 1);
        let recent = log.recent(10);
        assert_eq!(recent[0].tool_name, "delete_record");
        assert_eq!(recent[0].trust_tier, TrustTier::Peripheral);
        assert!(!recent[0].result.is_allowed());
    }

    #[test]
    fn test_audit_log_evicts_oldest() {
        let log = AuditLog::with_capacity(5);
        for i in 0..10 {
            log.record_decision(
                &device("speaker"),
                &format!("tool-{i}"),
                &format!("call-{i}"),
                DecisionResult::Allowed,
            );
        }

        assert_eq!(log.len(), 5);
        let recent = log.recent(10);
        assert_eq!(recent[0].tool_name, "tool-9");
        assert_eq!(recent[4].tool_name, "tool-5");
    }

    #[test]
    fn test_filter_by_device() {
        let log = AuditLog::new();
        log.record_decision(&device("a"), "t", "1", DecisionResult::Allowed);
        log.record_decision(&device("b"), "t", "2", DecisionResult::Allowed);
        log.record_decision(&device("a"), "t", "3", DecisionResult::Denied);

        let entries = log.for_device("a", 10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].call_id, "3");

        log.clear();
        assert!(log.is_empty());
    }
}
