//! On-disk service config schema and loading.
//!
//! Service descriptions live in per-service TOML files. This module owns the
//! loosely-typed serde schema and the conversion into the validated
//! [`ServiceConfig`] registry; everything after load works with the typed
//! form only.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::certificate::CertificateStore;
use crate::endpoint::EndpointName;
use crate::error::Result;
use crate::profile::{ProfileTables, TrackFamily};
use crate::service::{DrmPolicy, HdcpVersion, ServiceConfig};

/// Raw service config as deserialized from TOML, prior to validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServiceConfig {
    /// Service key name (e.g. `NF`).
    pub name: String,
    /// Alternative tags the service is known by.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Base64 trust certificate. Services without a pinned certificate fall
    /// back to the common Widevine privacy certificate.
    pub certificate: Option<String>,
    /// CDM system id to device fingerprint map.
    #[serde(default)]
    pub esn_map: HashMap<String, String>,
    /// Named endpoint URL templates.
    #[serde(default)]
    pub endpoints: HashMap<EndpointName, String>,
    /// Global DRM policy.
    pub drm: DrmPolicy,
    /// Per-family profile tables, grouped by quality tier.
    #[serde(default)]
    pub profiles: HashMap<TrackFamily, HashMap<String, Vec<String>>>,
    /// Default group preference order per family.
    #[serde(default)]
    pub group_order: HashMap<TrackFamily, Vec<String>>,
    /// Minimum HDCP version per group.
    #[serde(default)]
    pub group_hdcp: HashMap<String, HdcpVersion>,
}

impl RawServiceConfig {
    /// Validate and convert into an immutable [`ServiceConfig`].
    ///
    /// `runtime_params` declares the template parameters the deployment can
    /// supply at call time.
    pub fn into_config(self, runtime_params: &[&str]) -> Result<ServiceConfig> {
        let certificate = match self.certificate.as_deref() {
            Some(encoded) => CertificateStore::load_base64(encoded)?,
            None => CertificateStore::common_privacy(),
        };

        let profiles = ProfileTables::new(self.profiles, self.group_order, self.group_hdcp);

        ServiceConfig::new(
            self.name,
            self.aliases,
            certificate,
            self.esn_map,
            self.endpoints,
            self.drm,
            profiles,
            runtime_params,
        )
    }
}

/// Parse and validate a service config from TOML text.
pub fn from_toml_str(text: &str, runtime_params: &[&str]) -> Result<ServiceConfig> {
    let raw: RawServiceConfig = toml::from_str(text)?;
    let config = raw.into_config(runtime_params)?;
    tracing::debug!(
        service = config.name(),
        devices = config.esn_map().len(),
        endpoints = config.endpoints().len(),
        "service config validated"
    );
    Ok(config)
}

/// Load and validate a service config from a TOML file.
pub fn from_toml_path<P: AsRef<Path>>(path: P, runtime_params: &[&str]) -> Result<ServiceConfig> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let config = from_toml_str(&text, runtime_params)?;
    tracing::info!(
        service = config.name(),
        path = %path.as_ref().display(),
        "loaded service config"
    );
    Ok(config)
}
