//! Device identity resolution.
//!
//! Services issue a device fingerprint ("ESN") per decryption-module
//! identity; licenses are bound to it. Resolution is an exact-match lookup
//! in the service's ESN map. What happens on a miss is an entitlement
//! decision, so it is an explicit mode rather than an implicit default.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Policy for CDM system ids with no mapped fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// Fail with an entitlement error. The default.
    #[default]
    Strict,
    /// Derive a generic fingerprint from the decryption module's platform
    /// string. Only for deployments that explicitly allow unpinned devices.
    Permissive {
        /// Platform string reported by the decryption module.
        platform: String,
    },
}

/// Resolves a CDM system id to a service-issued device fingerprint.
#[derive(Debug)]
pub struct DeviceIdentityResolver<'a> {
    esn_map: &'a HashMap<String, String>,
    mode: &'a ResolveMode,
}

impl<'a> DeviceIdentityResolver<'a> {
    /// Create a resolver over a service's ESN map.
    pub fn new(esn_map: &'a HashMap<String, String>, mode: &'a ResolveMode) -> Self {
        Self { esn_map, mode }
    }

    /// Resolve a CDM system id to a device fingerprint.
    ///
    /// In strict mode an unmapped id is an error; a fabricated value is
    /// never returned. In permissive mode an unmapped id falls back to a
    /// fingerprint derived from the configured platform string.
    pub fn resolve(&self, cdm_system_id: &str) -> Result<String> {
        if let Some(fingerprint) = self.esn_map.get(cdm_system_id) {
            return Ok(fingerprint.clone());
        }

        match self.mode {
            ResolveMode::Strict => Err(Error::UnmappedDevice {
                system_id: cdm_system_id.to_string(),
            }),
            ResolveMode::Permissive { platform } => {
                let fingerprint = fallback_fingerprint(platform, cdm_system_id);
                tracing::debug!(
                    system_id = cdm_system_id,
                    fingerprint = %fingerprint,
                    "no mapped fingerprint, using permissive fallback"
                );
                Ok(fingerprint)
            }
        }
    }
}

/// Derive a generic fingerprint from a platform string and CDM system id.
///
/// The platform tag is uppercased with non-alphanumeric characters stripped
/// so repeated calls for the same device agree.
fn fallback_fingerprint(platform: &str, cdm_system_id: &str) -> String {
    let tag: String = platform
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("{}-{}", tag, cdm_system_id)
}
