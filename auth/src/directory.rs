//! Device id to trust tier classification.

use std::collections::{BTreeSet, HashMap};

use crate::tier::TrustTier;

/// Device id assigned when the handshake carries no device-id header.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

/// Built-in device table: (device id, tier, capabilities).
const BUILTIN_DEVICES: &[(&str, TrustTier, &[&str])] = &[
    ("command-console", TrustTier::GodMode, &["all"]),
    ("ops-tablet", TrustTier::Operator, &["voice", "tools", "notify"]),
    ("kitchen-speaker", TrustTier::Peripheral, &["voice", "tools"]),
    ("hallway-sensor", TrustTier::Peripheral, &["telemetry"]),
];

/// Tier and capability set assigned to a device id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceClassification {
    pub trust_tier: TrustTier,
    pub capabilities: BTreeSet<String>,
}

impl DeviceClassification {
    pub fn new(trust_tier: TrustTier, capabilities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            trust_tier,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Lowest tier, no capabilities.
    pub fn unclassified() -> Self {
        Self::default()
    }
}

/// Lookup from device id to classification.
///
/// Implementations must classify unknown ids at [`TrustTier::Public`].
pub trait DeviceDirectory: Send + Sync {
    fn classify(&self, device_id: &str) -> DeviceClassification;
}

/// In-process device table.
#[derive(Debug, Clone)]
pub struct StaticDeviceDirectory {
    devices: HashMap<String, DeviceClassification>,
}

impl StaticDeviceDirectory {
    /// Directory with no entries; every device is unclassified.
    pub fn empty() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Directory seeded with the built-in device table.
    pub fn builtin() -> Self {
        let devices = BUILTIN_DEVICES
            .iter()
            .map(|(id, tier, caps)| {
                (
                    id.to_string(),
                    DeviceClassification::new(*tier, caps.iter().copied()),
                )
            })
            .collect();
        Self { devices }
    }

    /// Add or replace an entry.
    pub fn with_device(
        mut self,
        device_id: impl Into<String>,
        classification: DeviceClassification,
    ) -> Self {
        self.insert(device_id, classification);
        self
    }

    pub fn insert(&mut self, device_id: impl Into<String>, classification: DeviceClassification) {
        let device_id = device_id.into();
        if device_id == UNKNOWN_DEVICE_ID {
            tracing::warn!("Ignoring directory entry for reserved device id '{UNKNOWN_DEVICE_ID}'");
            return;
        }
        self.devices.insert(device_id, classification);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for StaticDeviceDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DeviceDirectory for StaticDeviceDirectory {
    fn classify(&self, device_id: &str) -> DeviceClassification {
        self.devices
            .get(device_id)
            .cloned()
            .unwrap_or_else(DeviceClassification::unclassified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries() {
        let directory = StaticDeviceDirectory::builtin();
        assert_eq!(
            directory.classify("command-console").trust_tier,
            TrustTier::GodMode
        );
        assert_eq!(
            directory.classify("kitchen-speaker").trust_tier,
            TrustTier::Peripheral
        );
    }

    #[test]
    fn test_unknown_device_is_public() {
        let directory = StaticDeviceDirectory::builtin();
        let classification = directory.classify("never-seen");
        assert_eq!(classification.trust_tier, TrustTier::Public);
        assert!(classification.capabilities.is_empty());
    }

    #[test]
    fn test_reserved_unknown_id_cannot_be_elevated() {
        let directory = StaticDeviceDirectory::empty().with_device(
            UNKNOWN_DEVICE_ID,
            DeviceClassification::new(TrustTier::GodMode, ["all"]),
        );
        assert!(directory.is_empty());
        assert_eq!(
            directory.classify(UNKNOWN_DEVICE_ID).trust_tier,
            TrustTier::Public
        );
    }

    #[test]
    fn test_override_entry() {
        let directory = StaticDeviceDirectory::builtin().with_device(
            "kitchen-speaker",
            DeviceClassification::new(TrustTier::Operator, ["voice"]),
        );
        assert_eq!(
            directory.classify("kitchen-speaker").trust_tier,
            TrustTier::Operator
        );
    }
}
