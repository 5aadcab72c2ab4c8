//! Registry of live device connections.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

use dashmap::DashMap;
use device_auth::{DeviceProfile, TrustTier};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Authenticated; upstream session being opened.
    Connecting,
    /// Relaying in both directions.
    Proxying,
    /// Teardown in progress.
    Closing,
}

#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub connection_id: String,
    pub device_id: String,
    pub trust_tier: TrustTier,
    pub phase: ConnectionPhase,
    pub created_at: Instant,
    pub cancel_token: CancellationToken,
}

const DEFAULT_MAX_CONNECTIONS: usize = 1_000;

/// DashMap-backed connection table.
///
/// Capacity is claimed with an atomic reservation before the insert, so the
/// length check and the insert cannot race.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionEntry>,
    count: AtomicUsize,
    max_connections: usize,
    shutdown: CancellationToken,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn with_capacity(max_connections: usize) -> Self {
        Self {
            connections: DashMap::new(),
            count: AtomicUsize::new(0),
            max_connections,
            shutdown: CancellationToken::new(),
        }
    }

    /// Claim a slot before the WebSocket upgrade. `false` at capacity.
    pub fn try_reserve(&self) -> bool {
        loop {
            let current = self.count.load(Ordering::Relaxed);
            if current >= self.max_connections {
                warn!(
                    max = self.max_connections,
                    "Connection registry at capacity, rejecting connection"
                );
                return false;
            }
            if self
                .count
                .compare_exchange_weak(current, current + 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Return a slot reserved with [`Self::try_reserve`] that was never
    /// registered (e.g. the upgrade failed).
    pub fn release(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    /// Register a connection into an already reserved slot.
    ///
    /// The entry's token is a child of the registry-wide shutdown token.
    pub fn register(&self, device: &DeviceProfile) -> ConnectionEntry {
        let entry = ConnectionEntry {
            connection_id: device.connection_id().to_string(),
            device_id: device.device_id().to_string(),
            trust_tier: device.trust_tier(),
            phase: ConnectionPhase::Connecting,
            created_at: Instant::now(),
            cancel_token: self.shutdown.child_token(),
        };
        if let Some(old) = self
            .connections
            .insert(entry.connection_id.clone(), entry.clone())
        {
            // Same id registered twice: cancel the stale one and give back
            // the extra reservation.
            old.cancel_token.cancel();
            self.release();
        }
        debug!(
            connection_id = %entry.connection_id,
            device_id = %entry.device_id,
            "Connection registered"
        );
        entry
    }

    pub fn set_phase(&self, connection_id: &str, phase: ConnectionPhase) {
        if let Some(mut entry) = self.connections.get_mut(connection_id) {
            entry.phase = phase;
        }
    }

    pub fn get(&self, connection_id: &str) -> Option<ConnectionEntry> {
        self.connections.get(connection_id).map(|e| e.clone())
    }

    /// Remove, cancel, and free the slot. `None` if already removed.
    pub fn remove(&self, connection_id: &str) -> Option<ConnectionEntry> {
        self.connections.remove(connection_id).map(|(_, e)| {
            e.cancel_token.cancel();
            self.release();
            e
        })
    }

    /// Cancel every live connection; used on shutdown.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn count_by_phase(&self, phase: ConnectionPhase) -> usize {
        self.connections.iter().filter(|e| e.phase == phase).count()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
