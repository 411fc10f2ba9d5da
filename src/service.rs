//! Validated per-service configuration.
//!
//! A [`ServiceConfig`] is built once from parsed configuration data, checked
//! against the load-time invariants, and shared read-only with every
//! negotiation afterwards. Lookup mistakes that would otherwise surface as
//! per-request failures are rejected here instead.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::certificate::CertificateStore;
use crate::endpoint::{placeholders, EndpointName};
use crate::engine::ESN_PARAM;
use crate::error::{Error, Result};
use crate::profile::ProfileTables;

/// DRM systems a service can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrmSystem {
    Widevine,
    Playready,
}

impl fmt::Display for DrmSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrmSystem::Widevine => "widevine",
            DrmSystem::Playready => "playready",
        })
    }
}

impl FromStr for DrmSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "widevine" => Ok(DrmSystem::Widevine),
            "playready" => Ok(DrmSystem::Playready),
            _ => Err(Error::Config(format!("Unknown DRM system: {}", s))),
        }
    }
}

/// HDCP versions, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub enum HdcpVersion {
    #[serde(rename = "1.4")]
    V1_4,
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "2.1")]
    V2_1,
    #[serde(rename = "2.2")]
    V2_2,
    #[serde(rename = "2.3")]
    V2_3,
}

impl HdcpVersion {
    /// Dotted version string as service configs carry it.
    pub fn as_str(self) -> &'static str {
        match self {
            HdcpVersion::V1_4 => "1.4",
            HdcpVersion::V2_0 => "2.0",
            HdcpVersion::V2_1 => "2.1",
            HdcpVersion::V2_2 => "2.2",
            HdcpVersion::V2_3 => "2.3",
        }
    }
}

impl fmt::Display for HdcpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HdcpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.4" => Ok(HdcpVersion::V1_4),
            "2.0" => Ok(HdcpVersion::V2_0),
            "2.1" => Ok(HdcpVersion::V2_1),
            "2.2" => Ok(HdcpVersion::V2_2),
            "2.3" => Ok(HdcpVersion::V2_3),
            _ => Err(Error::Config(format!("Unknown HDCP version: {}", s))),
        }
    }
}

/// Global DRM policy of a service.
#[derive(Debug, Clone, Deserialize)]
pub struct DrmPolicy {
    /// DRM system the service licenses against.
    pub system: DrmSystem,
    /// DRM protocol version the service expects.
    pub version: u32,
    /// HDCP versions the service will engage.
    #[serde(default)]
    pub supported_hdcp: BTreeSet<HdcpVersion>,
    /// Whether HDCP is engaged for playback sessions.
    #[serde(default)]
    pub hdcp_engaged: bool,
}

/// Immutable, validated configuration of one streaming service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    name: String,
    aliases: Vec<String>,
    certificate: CertificateStore,
    esn_map: HashMap<String, String>,
    endpoints: HashMap<EndpointName, String>,
    drm: DrmPolicy,
    profiles: ProfileTables,
}

impl ServiceConfig {
    /// Build and validate a service config from parsed configuration data.
    ///
    /// `runtime_params` declares the template parameter names the deployment
    /// will supply at call time; a template placeholder outside that set
    /// (plus the engine-supplied `esn`) is a configuration error here rather
    /// than a render failure later.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        aliases: Vec<String>,
        certificate: CertificateStore,
        esn_map: HashMap<String, String>,
        endpoints: HashMap<EndpointName, String>,
        drm: DrmPolicy,
        profiles: ProfileTables,
        runtime_params: &[&str],
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Config("Service name is empty".to_string()));
        }

        for (system_id, fingerprint) in &esn_map {
            if system_id.is_empty() || fingerprint.is_empty() {
                return Err(Error::Config(format!(
                    "ESN map entry {:?} -> {:?} is empty",
                    system_id, fingerprint
                )));
            }
        }

        for (endpoint, template) in &endpoints {
            for placeholder in placeholders(template)? {
                if placeholder != ESN_PARAM && !runtime_params.contains(&placeholder) {
                    return Err(Error::Config(format!(
                        "{} endpoint references unsuppliable parameter {:?}",
                        endpoint, placeholder
                    )));
                }
            }
        }

        profiles.validate()?;

        Ok(Self {
            name,
            aliases,
            certificate,
            esn_map,
            endpoints,
            drm,
            profiles,
        })
    }

    /// Service key name (e.g. `NF`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a tag names this service, by key or alias, case-insensitive.
    pub fn matches(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(tag))
    }

    /// The service's trust certificate.
    pub fn certificate(&self) -> &CertificateStore {
        &self.certificate
    }

    /// CDM system id to device fingerprint map.
    pub fn esn_map(&self) -> &HashMap<String, String> {
        &self.esn_map
    }

    /// Named endpoint templates.
    pub fn endpoints(&self) -> &HashMap<EndpointName, String> {
        &self.endpoints
    }

    /// Global DRM policy.
    pub fn drm(&self) -> &DrmPolicy {
        &self.drm
    }

    /// Profile tables and selection policy.
    pub fn profiles(&self) -> &ProfileTables {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{DrmPolicy, DrmSystem, ServiceConfig};
    use crate::certificate::CertificateStore;
    use crate::endpoint::EndpointName;
    use crate::profile::{ProfileTables, TrackFamily};

    fn policy() -> DrmPolicy {
        DrmPolicy {
            system: DrmSystem::Widevine,
            version: 25,
            supported_hdcp: Default::default(),
            hdcp_engaged: false,
        }
    }

    fn profiles() -> ProfileTables {
        let groups = HashMap::from([("sdr".to_string(), vec!["profile-a".to_string()])]);
        ProfileTables::new(
            HashMap::from([(TrackFamily::H264, groups)]),
            HashMap::from([(TrackFamily::H264, vec!["sdr".to_string()])]),
            HashMap::new(),
        )
    }

    fn build(
        esn_map: HashMap<String, String>,
        endpoints: HashMap<EndpointName, String>,
        runtime_params: &[&str],
    ) -> crate::error::Result<ServiceConfig> {
        ServiceConfig::new(
            "NF",
            vec!["Netflix".to_string()],
            CertificateStore::load(b"cert").expect("cert"),
            esn_map,
            endpoints,
            policy(),
            profiles(),
            runtime_params,
        )
    }

    #[test]
    fn valid_config_constructs() {
        let endpoints = HashMap::from([(
            EndpointName::Manifest,
            "https://x/{build_id}/manifest".to_string(),
        )]);
        let config = build(
            HashMap::from([("4464".to_string(), "FP".to_string())]),
            endpoints,
            &["build_id"],
        )
        .expect("valid config");

        assert_eq!(config.name(), "NF");
        assert!(config.matches("netflix"));
        assert!(config.matches("nf"));
        assert!(!config.matches("hulu"));
    }

    #[test]
    fn unsuppliable_placeholder_is_rejected() {
        let endpoints = HashMap::from([(
            EndpointName::Manifest,
            "https://x/{build_id}/manifest".to_string(),
        )]);
        let err = build(HashMap::new(), endpoints, &[]).expect_err("unknown placeholder");
        assert!(format!("{}", err).contains("build_id"));
    }

    #[test]
    fn esn_placeholder_is_always_suppliable() {
        let endpoints = HashMap::from([(
            EndpointName::Licence,
            "https://x/licence?esn={esn}".to_string(),
        )]);
        build(HashMap::new(), endpoints, &[]).expect("esn is engine-supplied");
    }

    #[test]
    fn empty_fingerprint_is_rejected() {
        let err = build(
            HashMap::from([("4464".to_string(), String::new())]),
            HashMap::new(),
            &[],
        )
        .expect_err("empty fingerprint");
        assert!(format!("{}", err).contains("4464"));
    }
}
