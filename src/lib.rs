//! rsvine - per-service DRM configuration and negotiation engine.
//!
//! This crate provides:
//! - Validated, immutable per-service configuration: trust certificate,
//!   ESN map, endpoint templates, DRM policy, and profile tables.
//! - Device identity resolution with explicit strict/permissive modes.
//! - Endpoint URL template rendering.
//! - Ordered, deduplicated profile candidate selection with HDCP filtering.
//! - Per-request negotiation plans composing the above, ready to hand to
//!   manifest and license collaborators.
//!
//! Feature flags:
//! - `cli`: enable the CLI binary helpers.

/// Trust certificate storage.
pub mod certificate;
/// On-disk config schema and loading.
pub mod config;
/// Endpoint templates and resolution.
pub mod endpoint;
/// Negotiation plan assembly.
pub mod engine;
/// Device identity (ESN) resolution.
pub mod esn;
/// Common error types and Result alias.
pub mod error;
/// Profile tables and candidate selection.
pub mod profile;
/// Validated per-service configuration.
pub mod service;
