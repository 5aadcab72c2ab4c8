//! Device authentication and tool authorization for the realtime gateway.
//!
//! This module provides:
//! - Handshake authentication from connection headers ([`DeviceAuthenticator`])
//! - Device classification into ordered trust tiers ([`DeviceDirectory`])
//! - The per-tool minimum-tier gate used both for manifest filtering and at
//!   execution time ([`AuthorizationKernel`])

mod authenticator;
mod directory;
mod error;
mod kernel;
mod profile;
mod tier;

pub use authenticator::{AuthConfig, DeviceAuthenticator, DEFAULT_DEVICE_ID_HEADER};
pub use directory::{DeviceClassification, DeviceDirectory, StaticDeviceDirectory, UNKNOWN_DEVICE_ID};
pub use error::AuthError;
pub use kernel::{AuthorizationKernel, TierRequirement, UNREGISTERED_TOOL_TIER, WILDCARD_CAPABILITY};
pub use profile::DeviceProfile;
pub use tier::TrustTier;
