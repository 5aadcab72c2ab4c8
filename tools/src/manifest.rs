//! Per-device tool manifest.
//!
//! Filtering is a UX convenience: a device only sees what it could run. The
//! orchestrator re-checks authorization on every execution regardless.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use device_auth::{AuthorizationKernel, DeviceProfile, TrustTier};
use realtime_protocol::ToolDefinition;
use serde::Serialize;

use crate::catalog::{ToolCatalog, ToolDescriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestMeta {
    pub device_id: String,
    pub trust_tier: TrustTier,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolManifest {
    pub tools: Vec<ToolDescriptor>,
    pub meta: ManifestMeta,
}

impl ToolManifest {
    /// Tools in the upstream function-declaration format.
    pub fn to_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDefinition::from).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ToolManifestFilter {
    catalog: Arc<ToolCatalog>,
    kernel: Arc<AuthorizationKernel>,
}

impl ToolManifestFilter {
    pub fn new(catalog: Arc<ToolCatalog>, kernel: Arc<AuthorizationKernel>) -> Self {
        Self { catalog, kernel }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn filter_manifest(&self, device: &DeviceProfile) -> ToolManifest {
        let tools: Vec<ToolDescriptor> = self
            .catalog
            .tools()
            .iter()
            .filter(|tool| self.kernel.validate_access(&tool.name, device))
            .cloned()
            .collect();

        ToolManifest {
            meta: ManifestMeta {
                device_id: device.device_id().to_string(),
                trust_tier: device.trust_tier(),
                count: tools.len(),
                generated_at: Utc::now(),
            },
            tools,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ToolManifestFilter {
        ToolManifestFilter::new(
            Arc::new(ToolCatalog::builtin()),
            Arc::new(AuthorizationKernel::default()),
        )
    }

    fn device(tier: TrustTier) -> DeviceProfile {
        DeviceProfile::new("dev", tier, Vec::<String>::new(), "conn")
    }

    #[test]
    fn test_manifest_never_exceeds_device_tier() {
        let filter = filter();
        let kernel = AuthorizationKernel::default();
        for tier in TrustTier::ALL {
            let device = device(tier);
            let manifest = filter.filter_manifest(&device);
            assert_eq!(manifest.meta.count, manifest.tools.len());
            for tool in &manifest.tools {
                assert!(kernel.validate_access(&tool.name, &device));
                assert!(tier.satisfies(kernel.required_tier(&tool.name)));
            }
        }
    }

    #[test]
    fn test_god_mode_sees_full_catalog() {
        let filter = filter();
        let manifest = filter.filter_manifest(&device(TrustTier::GodMode));
        assert_eq!(manifest.tools.len(), filter.catalog().len());
    }

    #[test]
    fn test_peripheral_manifest() {
        let manifest = filter().filter_manifest(&device(TrustTier::Peripheral));
        let names: Vec<&str> = manifest.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["get_device_status", "search_database"]);
        assert_eq!(manifest.meta.trust_tier, TrustTier::Peripheral);
        assert_eq!(manifest.meta.device_id, "dev");
    }

    #[test]
    fn test_manifest_serialized_shape() {
        let manifest = filter().filter_manifest(&device(TrustTier::Public));
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value["tools"].is_array());
        assert_eq!(value["meta"]["trust_tier"], "PUBLIC");
        assert_eq!(value["meta"]["count"], 1);
        assert!(value["meta"]["generated_at"].is_string());
    }
}
