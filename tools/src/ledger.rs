//! Idempotency ledger.
//!
//! Per-key state machine:
//!
//! ```text
//!   absent --acquire--> PENDING --commit--> COMPLETED (terminal)
//!                          |
//!                          +----rollback--> absent
//! ```
//!
//! `acquire` is the only serialization point: exactly one caller observes
//! [`AcquireOutcome::Acquired`] for a key and may execute. Everyone else gets
//! the existing record back. `commit` and `rollback` only act on PENDING
//! records and report `false` otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Pending,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<Value>,
}

impl IdempotencyRecord {
    fn pending(key: &str) -> Self {
        Self {
            key: key.to_string(),
            state: RecordState::Pending,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == RecordState::Completed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquireOutcome {
    /// Caller created the PENDING record and owns execution.
    Acquired,
    /// A record already existed; nothing was mutated.
    Existing(IdempotencyRecord),
}

impl AcquireOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger backend unavailable: {0}")]
    Backend(String),
}

/// Storage behind the ledger transitions.
///
/// Implementations must make `acquire` an atomic check-and-insert across
/// every caller that can reach the same key (a unique-key insert for a
/// shared database).
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn acquire(&self, key: &str) -> Result<AcquireOutcome, LedgerError>;

    async fn commit(&self, key: &str, result: Value) -> Result<bool, LedgerError>;

    async fn rollback(&self, key: &str) -> Result<bool, LedgerError>;

    async fn lookup(&self, key: &str) -> Result<Option<IdempotencyRecord>, LedgerError>;

    /// Drop every record.
    async fn reset(&self) -> Result<(), LedgerError>;

    async fn len(&self) -> Result<usize, LedgerError>;
}

/// Single-process ledger.
///
/// Each transition holds the key's shard lock for its whole
/// check-and-mutate, so a rollback racing a fresh acquire on the same key
/// is linearized: the acquire either sees the PENDING record or the empty
/// slot, never a half-removed one.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: DashMap<String, IdempotencyRecord>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryLedger {
    async fn acquire(&self, key: &str) -> Result<AcquireOutcome, LedgerError> {
        Ok(match self.records.entry(key.to_string()) {
            Entry::Occupied(existing) => AcquireOutcome::Existing(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(IdempotencyRecord::pending(key));
                AcquireOutcome::Acquired
            }
        })
    }

    async fn commit(&self, key: &str, result: Value) -> Result<bool, LedgerError> {
        let Some(mut record) = self.records.get_mut(key) else {
            return Ok(false);
        };
        if record.state != RecordState::Pending {
            return Ok(false);
        }
        record.state = RecordState::Completed;
        record.completed_at = Some(Utc::now());
        record.result = Some(result);
        Ok(true)
    }

    async fn rollback(&self, key: &str) -> Result<bool, LedgerError> {
        Ok(self
            .records
            .remove_if(key, |_, record| record.state == RecordState::Pending)
            .is_some())
    }

    async fn lookup(&self, key: &str) -> Result<Option<IdempotencyRecord>, LedgerError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn reset(&self) -> Result<(), LedgerError> {
        self.records.clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.records.len())
    }
}

/// Deterministic key for a (device, call) pair.
///
/// Hex BLAKE3 over the length-prefixed device id followed by the call id.
pub fn idempotency_key(device_id: &str, call_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(device_id.len() as u64).to_le_bytes());
    hasher.update(device_id.as_bytes());
    hasher.update(call_id.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_second_acquire_is_not_new() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.acquire("k").await.unwrap().is_new());

        match ledger.acquire("k").await.unwrap() {
            AcquireOutcome::Existing(record) => {
                assert_eq!(record.state, RecordState::Pending);
                assert!(record.result.is_none());
            }
            AcquireOutcome::Acquired => panic!("expected existing record"),
        }
    }

    #[tokio::test]
    async fn test_commit_then_lookup_and_acquire_return_result() {
        let ledger = InMemoryLedger::new();
        ledger.acquire("k").await.unwrap();
        let result = json!({"success": true, "rows": 3});

        assert!(ledger.commit("k", result.clone()).await.unwrap());

        let record = ledger.lookup("k").await.unwrap().unwrap();
        assert!(record.is_completed());
        assert!(record.completed_at.is_some());
        assert_eq!(record.result.as_ref(), Some(&result));

        match ledger.acquire("k").await.unwrap() {
            AcquireOutcome::Existing(record) => assert_eq!(record.result, Some(result)),
            AcquireOutcome::Acquired => panic!("completed key re-acquired"),
        }
    }

    #[tokio::test]
    async fn test_completed_is_terminal() {
        let ledger = InMemoryLedger::new();
        ledger.acquire("k").await.unwrap();
        ledger.commit("k", json!({"v": 1})).await.unwrap();

        assert!(!ledger.rollback("k").await.unwrap());
        assert!(!ledger.commit("k", json!({"v": 2})).await.unwrap());

        let record = ledger.lookup("k").await.unwrap().unwrap();
        assert_eq!(record.result, Some(json!({"v": 1})));
    }

    #[tokio::test]
    async fn test_rollback_frees_key() {
        let ledger = InMemoryLedger::new();
        ledger.acquire("k").await.unwrap();

        assert!(ledger.rollback("k").await.unwrap());
        assert!(ledger.lookup("k").await.unwrap().is_none());
        assert!(!ledger.commit("k", json!({})).await.unwrap());
        assert!(!ledger.rollback("k").await.unwrap());
        assert!(ledger.acquire("k").await.unwrap().is_new());
    }

    #[tokio::test]
    async fn test_commit_on_absent_key_is_false() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.commit("missing", json!({})).await.unwrap());
        assert_eq!(ledger.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_records() {
        let ledger = InMemoryLedger::new();
        ledger.acquire("a").await.unwrap();
        ledger.acquire("b").await.unwrap();
        assert_eq!(ledger.len().await.unwrap(), 2);

        ledger.reset().await.unwrap();
        assert_eq!(ledger.len().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_single_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.acquire("shared").await.unwrap().is_new() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(idempotency_key("dev", "call_1"), idempotency_key("dev", "call_1"));
        assert_ne!(idempotency_key("dev", "call_1"), idempotency_key("dev", "call_2"));
        assert_ne!(idempotency_key("dev", "call_1"), idempotency_key("dev2", "call_1"));
        assert_eq!(idempotency_key("dev", "call_1").len(), 64);
    }

    #[test]
    fn test_key_boundaries_do_not_collide() {
        assert_ne!(idempotency_key("ab", "c"), idempotency_key("a", "bc"));
    }
}
