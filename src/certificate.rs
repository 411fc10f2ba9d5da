//! Trust certificate storage.
//!
//! The certificate bootstraps the secure license session and is handed,
//! opaque, to the external license-handshake component. Its binary encoding
//! is defined by the DRM scheme; this module only checks well-formedness at
//! load time and holds the bytes read-only afterwards.

use base64::Engine;

use crate::error::{Error, Result};

/// The widely-shared Widevine privacy certificate, used by services that do
/// not pin a certificate of their own.
pub const COMMON_PRIVACY_CERT: &str = concat!(
    "CAUSxwUKwQIIAxIQFwW5F8wSBIaLBjM6L3cqjBiCtIKSBSKOAjCCAQoCggEBAJntWzsy",
    "fateJO/DtiqVtZhSCtW8yzdQPgZFuBTYdrjfQFEEQa2M462xG7iMTnJaXkqeB5Up",
    "HVhYQCOn4a8OOKkSeTkwCGELbxWMh4x+Ib/7/up34QGeHleB6KRfRiY9FOYOgFioY",
    "Hrc4E+shFexN6jWfM3rM3BdmDoh+07svUoQykdJDKR+ql1DghjduvHK3jOS8T1v+",
    "2RC/THhv0CwxgTRxLpMlSCkv5fuvWCSmvzu9Vu69WTi0Ods18Vcc6CCuZYSC4NZ7",
    "c4kcHCCaA1vZ8bYLErF8xNEkKdO7DevSy8BDFnoKEPiWC8La59dsPxebt9k+9MI",
    "tHEbzxJQAZyfWgkCAwEAAToUbGljZW5zZS53aWRldmluZS5jb20SgAOuNHMUtag1",
    "KX8nE4j7e7jLUnfSSYI83dHaMLkzOVEes8y96gS5RLknwSE0bv296snUE5F+bsF2",
    "oQQ4RgpQO8GVK5uk5M4PxL/CCpgIqq9L/NGcHc/N9XTMrCjRtBBBbPneiAQwHL2z",
    "NMr80NQJeEI6ZC5UYT3wr8+WykqSSdhV5Cs6cD7xdn9qm9Nta/gr52u/DLpP3lnS",
    "q8x2/rZCR7hcQx+8pSJmthn8NpeVQ/ypy727+voOGlXnVaPHvOZV+WRvWCq5z3Cq",
    "CLl5+Gf2Ogsrf9s2LFvE7NVV2FvKqcWTw4PIV9Sdqrd+QLeFHd/SSZiAjjWyWOdd",
    "eOrAyhb3BHMEwg2T7eTo/xxvF+YkPj89qPwXCYcOxF+6gjomPwzvofcJOxkJkoMm",
    "MzcFBDopvab5tDQsyN9UPLGhGC98X/8z8QSQ+spbJTYLdgFenFoGq47gLwDS6NWY",
    "YQSqzE3Udf2W7pzk4ybyG4PHBYV3s4cyzdq8amvtE/sNSdOKReuHpfQ="
);

/// Holds a service's trust certificate bytes, write-once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateStore {
    bytes: Vec<u8>,
}

impl CertificateStore {
    /// Load a certificate from raw bytes.
    ///
    /// Fails when the input is empty; the certificate's inner encoding is
    /// opaque to this engine and not inspected further.
    pub fn load(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::Config("Certificate is empty".to_string()));
        }
        Ok(Self {
            bytes: raw.to_vec(),
        })
    }

    /// Load a certificate from a base64 string, as service configs store it.
    pub fn load_base64(encoded: &str) -> Result<Self> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(Error::Base64DecodeError)?;
        Self::load(&raw)
    }

    /// The common Widevine privacy certificate.
    pub fn common_privacy() -> Self {
        // The embedded constant is known-good base64.
        Self::load_base64(COMMON_PRIVACY_CERT).expect("Invalid common privacy certificate")
    }

    /// Read-only view of the certificate bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
