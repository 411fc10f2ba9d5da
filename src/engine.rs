//! Negotiation plan assembly.
//!
//! A plan is the per-request decision bundle handed to the manifest and
//! license collaborators: which device fingerprint to present, which
//! manifest URL to call, and which ordered profile candidates to request per
//! track family. Plans are all-or-nothing; a partially-resolved identity or
//! endpoint is useless to a license call, so the first sub-resolution
//! failure aborts the whole plan.

use std::collections::HashMap;

use crate::endpoint::{EndpointName, EndpointRouter};
use crate::esn::{DeviceIdentityResolver, ResolveMode};
use crate::error::Result;
use crate::profile::{Constraints, ProfileSelector, TrackFamily};
use crate::service::ServiceConfig;

/// Template parameter the engine supplies itself: the resolved fingerprint.
pub const ESN_PARAM: &str = "esn";

/// One requested track family with its selection constraints.
#[derive(Debug, Clone)]
pub struct TrackRequest {
    pub family: TrackFamily,
    pub constraints: Constraints,
}

/// Ordered candidate profiles selected for one track family.
///
/// The profile order is the caller's fallback retry order against the
/// service's manifest response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelection {
    pub family: TrackFamily,
    pub profiles: Vec<String>,
}

/// A fully-resolved, immutable per-request plan.
///
/// Built fresh per request; parameters like the build id vary per call, so
/// plans are never cached.
#[derive(Debug, Clone)]
pub struct NegotiationPlan {
    /// Device fingerprint to present to the service.
    pub device_fingerprint: String,
    /// Rendered manifest endpoint URL.
    pub manifest_url: String,
    /// Candidate profiles per requested family, in request order.
    pub tracks: Vec<TrackSelection>,
}

/// Composes identity resolution, endpoint routing, and profile selection
/// over a shared read-only [`ServiceConfig`].
#[derive(Debug)]
pub struct NegotiationEngine<'a> {
    config: &'a ServiceConfig,
    mode: ResolveMode,
}

impl<'a> NegotiationEngine<'a> {
    /// Create an engine in strict device-resolution mode.
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self::with_mode(config, ResolveMode::Strict)
    }

    /// Create an engine with an explicit device-resolution mode.
    pub fn with_mode(config: &'a ServiceConfig, mode: ResolveMode) -> Self {
        Self { config, mode }
    }

    /// Trust certificate bytes for the license-handshake collaborator.
    pub fn certificate(&self) -> &[u8] {
        self.config.certificate().bytes()
    }

    /// Build a plan for a set of track requests.
    ///
    /// The fingerprint is resolved once (identity does not vary per track)
    /// and is additionally made available to endpoint templates as `{esn}`.
    /// Any sub-resolution failure aborts the whole plan.
    pub fn plan(
        &self,
        cdm_system_id: &str,
        track_requests: &[TrackRequest],
        runtime_params: &HashMap<String, String>,
    ) -> Result<NegotiationPlan> {
        let resolver = DeviceIdentityResolver::new(self.config.esn_map(), &self.mode);
        let device_fingerprint = resolver.resolve(cdm_system_id)?;

        let mut params = runtime_params.clone();
        params.insert(ESN_PARAM.to_string(), device_fingerprint.clone());

        let router = EndpointRouter::new(self.config.endpoints());
        let manifest_url = router.render(EndpointName::Manifest, &params)?;

        let selector = ProfileSelector::new(self.config.profiles(), self.config.drm());
        let mut tracks = Vec::with_capacity(track_requests.len());
        for request in track_requests {
            let profiles = selector.select(request.family, &request.constraints)?;
            tracks.push(TrackSelection {
                family: request.family,
                profiles,
            });
        }

        tracing::debug!(
            service = self.config.name(),
            fingerprint = %device_fingerprint,
            families = tracks.len(),
            "negotiation plan built"
        );

        Ok(NegotiationPlan {
            device_fingerprint,
            manifest_url,
            tracks,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{NegotiationEngine, TrackRequest, ESN_PARAM};
    use crate::certificate::CertificateStore;
    use crate::endpoint::EndpointName;
    use crate::error::Error;
    use crate::esn::ResolveMode;
    use crate::profile::{Constraints, ProfileTables, TrackFamily};
    use crate::service::{DrmPolicy, DrmSystem, ServiceConfig};

    fn config() -> ServiceConfig {
        let video = HashMap::from([
            (
                "sdr".to_string(),
                vec!["video-main".to_string(), "video-baseline".to_string()],
            ),
            ("hdr10".to_string(), vec!["video-hdr".to_string()]),
        ]);
        let audio = HashMap::from([("aac".to_string(), vec!["audio-heaac".to_string()])]);
        let profiles = ProfileTables::new(
            HashMap::from([(TrackFamily::H264, video), (TrackFamily::Aac, audio)]),
            HashMap::from([
                (
                    TrackFamily::H264,
                    vec!["hdr10".to_string(), "sdr".to_string()],
                ),
                (TrackFamily::Aac, vec!["aac".to_string()]),
            ]),
            HashMap::new(),
        );

        ServiceConfig::new(
            "NF",
            vec![],
            CertificateStore::load(b"cert").expect("cert"),
            HashMap::from([(
                "4464".to_string(),
                "NFANDROID1-PRV-P-GOOGLEPIXEL".to_string(),
            )]),
            HashMap::from([
                (
                    EndpointName::Manifest,
                    "https://x/{build_id}/manifest?esn={esn}".to_string(),
                ),
                (EndpointName::Website, "https://x/browse".to_string()),
            ]),
            DrmPolicy {
                system: DrmSystem::Widevine,
                version: 25,
                supported_hdcp: Default::default(),
                hdcp_engaged: false,
            },
            profiles,
            &["build_id"],
        )
        .expect("valid config")
    }

    fn requests() -> Vec<TrackRequest> {
        vec![
            TrackRequest {
                family: TrackFamily::H264,
                constraints: Constraints::for_system(DrmSystem::Widevine),
            },
            TrackRequest {
                family: TrackFamily::Aac,
                constraints: Constraints::for_system(DrmSystem::Widevine),
            },
        ]
    }

    #[test]
    fn plan_resolves_all_parts() {
        let config = config();
        let engine = NegotiationEngine::new(&config);
        let params = HashMap::from([("build_id".to_string(), "12345".to_string())]);

        let plan = engine.plan("4464", &requests(), &params).expect("plan");
        assert_eq!(plan.device_fingerprint, "NFANDROID1-PRV-P-GOOGLEPIXEL");
        assert_eq!(
            plan.manifest_url,
            "https://x/12345/manifest?esn=NFANDROID1-PRV-P-GOOGLEPIXEL"
        );
        assert_eq!(plan.tracks.len(), 2);
        assert_eq!(
            plan.tracks[0].profiles,
            vec!["video-hdr", "video-main", "video-baseline"]
        );
        assert_eq!(plan.tracks[1].profiles, vec!["audio-heaac"]);
    }

    #[test]
    fn plan_fails_without_any_partial_result() {
        let config = config();
        let engine = NegotiationEngine::new(&config);
        let params = HashMap::from([("build_id".to_string(), "12345".to_string())]);

        // Second family has no table; the whole plan must fail, not just
        // the one selection.
        let mut reqs = requests();
        reqs[1].family = TrackFamily::Eac3;
        let err = engine.plan("4464", &reqs, &params).expect_err("no plan");
        assert!(matches!(err, Error::NoEligibleProfile { .. }));
    }

    #[test]
    fn plan_fails_on_unmapped_device() {
        let config = config();
        let engine = NegotiationEngine::new(&config);
        let params = HashMap::from([("build_id".to_string(), "12345".to_string())]);

        let err = engine.plan("9999", &requests(), &params).expect_err("strict");
        assert!(matches!(err, Error::UnmappedDevice { .. }));
    }

    #[test]
    fn plan_fails_on_missing_runtime_param() {
        let config = config();
        let engine = NegotiationEngine::new(&config);

        let err = engine
            .plan("4464", &requests(), &HashMap::new())
            .expect_err("no build_id");
        assert!(matches!(err, Error::MissingParam { ref param, .. } if param == "build_id"));
    }

    #[test]
    fn permissive_engine_supplies_fallback_esn() {
        let config = config();
        let engine = NegotiationEngine::with_mode(
            &config,
            ResolveMode::Permissive {
                platform: "browser".to_string(),
            },
        );
        let params = HashMap::from([("build_id".to_string(), "12345".to_string())]);

        let plan = engine.plan("9999", &requests(), &params).expect("fallback");
        assert_eq!(plan.device_fingerprint, "BROWSER-9999");
        assert!(plan.manifest_url.ends_with("esn=BROWSER-9999"));
    }

    #[test]
    fn caller_supplied_esn_param_is_overridden() {
        let config = config();
        let engine = NegotiationEngine::new(&config);
        let params = HashMap::from([
            ("build_id".to_string(), "12345".to_string()),
            (ESN_PARAM.to_string(), "spoofed".to_string()),
        ]);

        let plan = engine.plan("4464", &requests(), &params).expect("plan");
        assert!(plan.manifest_url.ends_with("esn=NFANDROID1-PRV-P-GOOGLEPIXEL"));
    }

    #[test]
    fn certificate_passthrough() {
        let config = config();
        let engine = NegotiationEngine::new(&config);
        assert_eq!(engine.certificate(), b"cert");
    }
}
