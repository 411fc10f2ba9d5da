//! Error types for rsvine.

use thiserror::Error;

/// Main error type for rsvine operations.
///
/// Variants are grouped by remediation: configuration errors are fatal at
/// load time, device errors mean the caller must pick another device,
/// endpoint errors are fatal to the request, and profile errors mean the
/// content has no acceptable quality variant.
#[derive(Debug, Error)]
pub enum Error {
    /// The service configuration is malformed or incomplete.
    #[error("Invalid service config: {0}")]
    Config(String),

    /// No device fingerprint is mapped for the CDM system id (strict mode).
    #[error("Device not entitled: no fingerprint mapped for CDM system id {system_id:?}")]
    UnmappedDevice { system_id: String },

    /// The endpoint name is not configured for this service.
    #[error("Endpoint error: no {0:?} endpoint configured")]
    UnknownEndpoint(String),

    /// A template placeholder has no value in the supplied parameters.
    #[error("Endpoint error: missing parameter {param:?} for {endpoint:?} endpoint")]
    MissingParam { endpoint: String, param: String },

    /// Constraints eliminated every candidate profile.
    #[error("No eligible profile for {family:?}: {reason}")]
    NoEligibleProfile { family: String, reason: String },

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for rsvine operations.
pub type Result<T> = std::result::Result<T, Error>;
