use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tier::TrustTier;

/// Identity of an authenticated device, scoped to one connection.
///
/// Built once at handshake and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    device_id: String,
    trust_tier: TrustTier,
    capabilities: BTreeSet<String>,
    connection_id: String,
    authenticated_at: DateTime<Utc>,
}

impl DeviceProfile {
    pub fn new(
        device_id: impl Into<String>,
        trust_tier: TrustTier,
        capabilities: impl IntoIterator<Item = impl Into<String>>,
        connection_id: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            trust_tier,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            connection_id: connection_id.into(),
            authenticated_at: Utc::now(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn trust_tier(&self) -> TrustTier {
        self.trust_tier
    }

    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}
