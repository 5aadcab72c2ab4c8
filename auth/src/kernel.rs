//! Tool authorization kernel.
//!
//! Pure mapping from (tool name, device tier) to allow/deny. The same table
//! drives manifest filtering and execution-time checks, so the two can never
//! disagree.
//!
//! Unregistered tools require [`UNREGISTERED_TOOL_TIER`] (fail-closed). The
//! output validator deliberately uses the opposite policy for unregistered
//! tools; keep the asymmetry in mind when adding tools to one table and not
//! the other.

use std::collections::HashMap;

use crate::{profile::DeviceProfile, tier::TrustTier};

/// Tier required for any tool missing from the table: second-highest.
pub const UNREGISTERED_TOOL_TIER: TrustTier = TrustTier::Operator;

/// Capability token that grants every capability.
pub const WILDCARD_CAPABILITY: &str = "all";

const DEFAULT_TOOL_TIERS: &[(&str, TrustTier)] = &[
    ("get_device_status", TrustTier::Public),
    ("search_database", TrustTier::Peripheral),
    ("send_email", TrustTier::Operator),
    ("trigger_webhook", TrustTier::Operator),
    ("create_record", TrustTier::Operator),
    ("delete_record", TrustTier::GodMode),
];

/// Minimum tier a tool demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRequirement {
    Registered(TrustTier),
    Unregistered,
}

impl TierRequirement {
    pub fn tier(self) -> TrustTier {
        match self {
            TierRequirement::Registered(tier) => tier,
            TierRequirement::Unregistered => UNREGISTERED_TOOL_TIER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationKernel {
    tool_tiers: HashMap<String, TrustTier>,
}

impl AuthorizationKernel {
    /// Kernel with an empty table; every tool falls back to
    /// [`UNREGISTERED_TOOL_TIER`].
    pub fn empty() -> Self {
        Self {
            tool_tiers: HashMap::new(),
        }
    }

    pub fn with_tool_tier(mut self, tool_name: impl Into<String>, tier: TrustTier) -> Self {
        self.tool_tiers.insert(tool_name.into(), tier);
        self
    }

    pub fn requirement(&self, tool_name: &str) -> TierRequirement {
        match self.tool_tiers.get(tool_name) {
            Some(tier) => TierRequirement::Registered(*tier),
            None => TierRequirement::Unregistered,
        }
    }

    pub fn required_tier(&self, tool_name: &str) -> TrustTier {
        self.requirement(tool_name).tier()
    }

    /// Whether `device` may see and invoke `tool_name`.
    pub fn validate_access(&self, tool_name: &str, device: &DeviceProfile) -> bool {
        let tier = device.trust_tier();
        if tier == TrustTier::GodMode {
            return true;
        }
        tier.satisfies(self.required_tier(tool_name))
    }

    /// Subset of `tool_names` the device may access, order preserved.
    pub fn filter_tools_for_device<I, S>(&self, tool_names: I, device: &DeviceProfile) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tool_names
            .into_iter()
            .filter(|name| self.validate_access(name.as_ref(), device))
            .map(|name| name.as_ref().to_string())
            .collect()
    }

    /// Capability check; [`WILDCARD_CAPABILITY`] grants everything.
    pub fn has_capability(device: &DeviceProfile, capability: &str) -> bool {
        let capabilities = device.capabilities();
        capabilities.contains(WILDCARD_CAPABILITY) || capabilities.contains(capability)
    }
}

impl Default for AuthorizationKernel {
    fn default() -> Self {
        DEFAULT_TOOL_TIERS
            .iter()
            .fold(Self::empty(), |kernel, (name, tier)| {
                kernel.with_tool_tier(*name, *tier)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(tier: TrustTier, caps: &[&str]) -> DeviceProfile {
        DeviceProfile::new("device-1", tier, caps.iter().copied(), "conn-1")
    }

    #[test]
    fn test_peripheral_cannot_delete() {
        let kernel = AuthorizationKernel::default();
        let peripheral = device(TrustTier::Peripheral, &[]);
        assert!(!kernel.validate_access("delete_record", &peripheral));
        assert!(kernel.validate_access("search_database", &peripheral));
        assert!(kernel.validate_access("get_device_status", &peripheral));
    }

    #[test]
    fn test_god_mode_bypasses_table() {
        let kernel = AuthorizationKernel::empty().with_tool_tier("anything", TrustTier::GodMode);
        let god = device(TrustTier::GodMode, &[]);
        assert!(kernel.validate_access("anything", &god));
        assert!(kernel.validate_access("not_in_table", &god));
    }

    #[test]
    fn test_unknown_tool_fails_closed() {
        let kernel = AuthorizationKernel::default();
        assert_eq!(
            kernel.requirement("launch_rockets"),
            TierRequirement::Unregistered
        );
        assert!(!kernel.validate_access("launch_rockets", &device(TrustTier::Peripheral, &[])));
        assert!(kernel.validate_access("launch_rockets", &device(TrustTier::Operator, &[])));
    }

    #[test]
    fn test_public_sees_only_public_tools() {
        let kernel = AuthorizationKernel::default();
        let public = device(TrustTier::Public, &[]);
        let names = ["get_device_status", "search_database", "send_email"];
        assert_eq!(
            kernel.filter_tools_for_device(names, &public),
            vec!["get_device_status".to_string()]
        );
    }

    #[test]
    fn test_filter_matches_validate_access_for_every_tier() {
        let kernel = AuthorizationKernel::default();
        let names: Vec<&str> = DEFAULT_TOOL_TIERS
            .iter()
            .map(|(name, _)| *name)
            .chain(["unregistered_tool"])
            .collect();

        for tier in TrustTier::ALL {
            let profile = device(tier, &[]);
            let visible = kernel.filter_tools_for_device(&names, &profile);
            for name in &names {
                assert_eq!(
                    visible.iter().any(|v| v == name),
                    kernel.validate_access(name, &profile),
                    "tier {tier} tool {name}"
                );
            }
        }
    }

    #[test]
    fn test_has_capability_wildcard() {
        let admin = device(TrustTier::GodMode, &["all"]);
        let speaker = device(TrustTier::Peripheral, &["voice"]);
        assert!(AuthorizationKernel::has_capability(&admin, "notify"));
        assert!(AuthorizationKernel::has_capability(&speaker, "voice"));
        assert!(!AuthorizationKernel::has_capability(&speaker, "notify"));
    }
}
