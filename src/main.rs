#![cfg(feature = "cli")]
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use rsvine::config::from_toml_path;
use rsvine::endpoint::EndpointName;
use rsvine::engine::{NegotiationEngine, TrackRequest};
use rsvine::esn::ResolveMode;
use rsvine::profile::{Constraints, TrackFamily};
use rsvine::service::{DrmSystem, HdcpVersion, ServiceConfig};

use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "rsvine", version, about = "rsvine CLI")]
struct Cli {
    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load and validate a service config file, then print a summary.
    ///
    /// Declare the runtime parameters the deployment will supply with
    /// repeated --param flags; endpoint templates referencing anything else
    /// are rejected.
    Check {
        config_path: PathBuf,
        #[arg(short = 'P', long = "param")]
        params: Vec<String>,
    },
    /// Build and print a negotiation plan from a service config.
    ///
    /// Stops where the network collaborators take over: the printed plan is
    /// what a manifest or license call would be handed.
    Plan {
        config_path: PathBuf,
        /// CDM system id reported by the decryption module.
        #[arg(short = 's', long = "system-id")]
        system_id: String,
        /// Track families to negotiate (e.g. h265, aac).
        #[arg(short = 'f', long = "family", required = true)]
        families: Vec<String>,
        /// Runtime template parameters as key=value.
        #[arg(short = 'P', long = "param")]
        params: Vec<String>,
        /// DRM system the device speaks (defaults to the service's).
        #[arg(long = "drm")]
        drm: Option<String>,
        /// Highest HDCP version the output path can engage.
        #[arg(long = "hdcp")]
        hdcp: Option<String>,
        /// Explicit profile groups overriding the default order.
        #[arg(short = 'g', long = "group")]
        groups: Vec<String>,
        /// Allow unmapped devices, deriving a fingerprint from this
        /// platform string.
        #[arg(long = "permissive", value_name = "PLATFORM")]
        permissive: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Check {
            config_path,
            params,
        } => run_check(&config_path, &params),
        Commands::Plan {
            config_path,
            system_id,
            families,
            params,
            drm,
            hdcp,
            groups,
            permissive,
        } => run_plan(
            &config_path,
            &system_id,
            &families,
            &params,
            drm.as_deref(),
            hdcp.as_deref(),
            &groups,
            permissive,
        ),
    }
}

/// Split repeated `key=value` (or bare `key`) arguments into a map.
fn parse_params(params: &[String]) -> HashMap<String, String> {
    params
        .iter()
        .map(|p| match p.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (p.clone(), String::new()),
        })
        .collect()
}

fn load_config(config_path: &Path, params: &HashMap<String, String>) -> anyhow::Result<ServiceConfig> {
    let names: Vec<&str> = params.keys().map(String::as_str).collect();
    let config = from_toml_path(config_path, &names)
        .with_context(|| format!("Failed to load service config {}", config_path.display()))?;
    Ok(config)
}

fn run_check(config_path: &Path, params: &[String]) -> anyhow::Result<()> {
    let params = parse_params(params);
    let config = load_config(config_path, &params)?;

    info!(
        "[+] Valid Service Config: {} ({}, DRM v{})",
        config.name(),
        config.drm().system,
        config.drm().version
    );
    info!("[+] Mapped devices: {}", config.esn_map().len());
    info!("[+] Certificate: {} bytes", config.certificate().bytes().len());
    let supported: Vec<&str> = config
        .drm()
        .supported_hdcp
        .iter()
        .map(|v| v.as_str())
        .collect();
    info!(
        "[+] HDCP: {} (supported: {})",
        if config.drm().hdcp_engaged {
            "engaged"
        } else {
            "not engaged"
        },
        if supported.is_empty() {
            "none".to_string()
        } else {
            supported.join(", ")
        }
    );
    for name in [
        EndpointName::Website,
        EndpointName::Manifest,
        EndpointName::Licence,
        EndpointName::Metadata,
    ] {
        if let Some(template) = config.endpoints().get(&name) {
            info!("[+] Endpoint {}: {}", name, template);
        }
    }
    let mut families: Vec<TrackFamily> = config.profiles().families().collect();
    families.sort_by_key(|f| f.as_str());
    for family in families {
        info!(
            "[+] Profiles for {}: {}",
            family,
            config.profiles().profile_count(family)
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_plan(
    config_path: &Path,
    system_id: &str,
    families: &[String],
    params: &[String],
    drm: Option<&str>,
    hdcp: Option<&str>,
    groups: &[String],
    permissive: Option<String>,
) -> anyhow::Result<()> {
    let params = parse_params(params);
    let config = load_config(config_path, &params)?;

    let drm_system = match drm {
        Some(s) => DrmSystem::from_str(s)?,
        None => config.drm().system,
    };
    let hdcp_level = hdcp.map(HdcpVersion::from_str).transpose()?;
    let constraints = Constraints {
        drm_system,
        hdcp_level,
        groups: if groups.is_empty() {
            None
        } else {
            Some(groups.to_vec())
        },
    };

    let requests = families
        .iter()
        .map(|f| {
            Ok(TrackRequest {
                family: TrackFamily::from_str(f)?,
                constraints: constraints.clone(),
            })
        })
        .collect::<rsvine::error::Result<Vec<_>>>()?;

    let mode = match permissive {
        Some(platform) => ResolveMode::Permissive { platform },
        None => ResolveMode::Strict,
    };
    let engine = NegotiationEngine::with_mode(&config, mode);
    let plan = engine.plan(system_id, &requests, &params)?;

    info!("[+] Device Fingerprint: {}", plan.device_fingerprint);
    info!("[+] Manifest URL: {}", plan.manifest_url);
    for track in &plan.tracks {
        info!("[+] Candidates for {}:", track.family);
        for profile in &track.profiles {
            info!("      {}", profile);
        }
    }
    Ok(())
}
