//! Handshake authentication.

use std::sync::Arc;

use http::{header::AUTHORIZATION, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    directory::{DeviceDirectory, StaticDeviceDirectory, UNKNOWN_DEVICE_ID},
    error::AuthError,
    profile::DeviceProfile,
};

pub const DEFAULT_DEVICE_ID_HEADER: &str = "x-device-id";
const DEFAULT_TOKEN_PREFIX: &str = "dev_";
const BEARER_SCHEME: &str = "bearer ";

/// Handshake credential settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Prefix the opaque part of the bearer token must start with.
    #[serde(default = "default_token_prefix")]
    pub token_prefix: String,

    /// Header carrying the device id.
    #[serde(default = "default_device_id_header")]
    pub device_id_header: String,
}

fn default_token_prefix() -> String {
    DEFAULT_TOKEN_PREFIX.to_string()
}

fn default_device_id_header() -> String {
    DEFAULT_DEVICE_ID_HEADER.to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_prefix: default_token_prefix(),
            device_id_header: default_device_id_header(),
        }
    }
}

/// Turns handshake headers into a [`DeviceProfile`], failing closed.
#[derive(Clone)]
pub struct DeviceAuthenticator {
    config: AuthConfig,
    directory: Arc<dyn DeviceDirectory>,
}

impl DeviceAuthenticator {
    pub fn new(config: AuthConfig, directory: Arc<dyn DeviceDirectory>) -> Self {
        Self { config, directory }
    }

    /// Authenticator over the built-in device table.
    pub fn with_builtin_directory(config: AuthConfig) -> Self {
        Self::new(config, Arc::new(StaticDeviceDirectory::builtin()))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate a handshake and classify the device.
    ///
    /// The credential must be `Bearer <prefix><opaque>`. A missing device-id
    /// header is not an error: the device is treated as `unknown` and lands
    /// in the lowest tier.
    pub fn authenticate(
        &self,
        headers: &HeaderMap,
        connection_id: &str,
    ) -> Result<DeviceProfile, AuthError> {
        self.check_credential(headers)?;

        let device_id = headers
            .get(self.config.device_id_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_DEVICE_ID);

        let classification = self.directory.classify(device_id);
        debug!(
            device_id,
            connection_id,
            trust_tier = %classification.trust_tier,
            "Device authenticated"
        );

        Ok(DeviceProfile::new(
            device_id,
            classification.trust_tier,
            classification.capabilities,
            connection_id,
        ))
    }

    fn check_credential(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingCredential)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredential)?
            .trim();

        if value.len() < BEARER_SCHEME.len()
            || !value[..BEARER_SCHEME.len()].eq_ignore_ascii_case(BEARER_SCHEME)
        {
            return Err(AuthError::MalformedCredential);
        }

        let token = value[BEARER_SCHEME.len()..].trim_start();
        match token.strip_prefix(self.config.token_prefix.as_str()) {
            Some(opaque) if !opaque.is_empty() => Ok(()),
            _ => Err(AuthError::PrefixMismatch),
        }
    }
}

impl std::fmt::Debug for DeviceAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAuthenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
