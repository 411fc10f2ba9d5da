//! Profile tables and candidate selection.
//!
//! Each service declares, per codec family, ordered lists of the encoding
//! profiles it may serve, grouped by quality tier. List order is
//! load-bearing twice over: it is the provider-declared preference order and
//! the caller's fallback retry order when a manifest response omits the
//! leading candidates. Nothing here may reorder it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::service::{DrmPolicy, DrmSystem, HdcpVersion};

/// Codec families a track request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackFamily {
    H264,
    H265,
    Vp9,
    Av1,
    Aac,
    Eac3,
    Subtitles,
}

impl TrackFamily {
    /// Lowercase name as it appears in service configs.
    pub fn as_str(self) -> &'static str {
        match self {
            TrackFamily::H264 => "h264",
            TrackFamily::H265 => "h265",
            TrackFamily::Vp9 => "vp9",
            TrackFamily::Av1 => "av1",
            TrackFamily::Aac => "aac",
            TrackFamily::Eac3 => "eac3",
            TrackFamily::Subtitles => "subtitles",
        }
    }

    /// Whether this family carries video, and so is subject to HDCP tiers.
    pub fn is_video(self) -> bool {
        matches!(
            self,
            TrackFamily::H264 | TrackFamily::H265 | TrackFamily::Vp9 | TrackFamily::Av1
        )
    }

    /// Whether this family carries audio.
    pub fn is_audio(self) -> bool {
        matches!(self, TrackFamily::Aac | TrackFamily::Eac3)
    }
}

impl fmt::Display for TrackFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "h264" => Ok(TrackFamily::H264),
            "h265" | "hevc" => Ok(TrackFamily::H265),
            "vp9" => Ok(TrackFamily::Vp9),
            "av1" => Ok(TrackFamily::Av1),
            "aac" => Ok(TrackFamily::Aac),
            "eac3" | "ec3" => Ok(TrackFamily::Eac3),
            "subtitles" | "sub" => Ok(TrackFamily::Subtitles),
            _ => Err(Error::Config(format!("Unknown track family: {}", s))),
        }
    }
}

/// Per-service profile policy: the grouped tables plus the two pieces the
/// deployment must configure rather than the code hard-coding them, the
/// default group preference order and the per-group HDCP floors.
#[derive(Debug, Clone, Default)]
pub struct ProfileTables {
    tables: HashMap<TrackFamily, HashMap<String, Vec<String>>>,
    group_order: HashMap<TrackFamily, Vec<String>>,
    group_hdcp: HashMap<String, HdcpVersion>,
}

impl ProfileTables {
    /// Assemble profile tables from parsed configuration data.
    ///
    /// Invariants are checked by [`ProfileTables::validate`], which
    /// [`crate::service::ServiceConfig`] runs at load time.
    pub fn new(
        tables: HashMap<TrackFamily, HashMap<String, Vec<String>>>,
        group_order: HashMap<TrackFamily, Vec<String>>,
        group_hdcp: HashMap<String, HdcpVersion>,
    ) -> Self {
        Self {
            tables,
            group_order,
            group_hdcp,
        }
    }

    /// Track families with configured profiles.
    pub fn families(&self) -> impl Iterator<Item = TrackFamily> + '_ {
        self.tables.keys().copied()
    }

    /// Total number of distinct profiles configured for a family.
    pub fn profile_count(&self, family: TrackFamily) -> usize {
        self.tables
            .get(&family)
            .map(|groups| groups.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Check the load-time invariants.
    ///
    /// - a profile id may not be claimed by two groups of the same family;
    /// - every family with a table needs a default group preference order,
    ///   and that order may only name the family's own groups;
    /// - HDCP floors may only name groups that exist in some table.
    pub(crate) fn validate(&self) -> Result<()> {
        for (family, groups) in &self.tables {
            let mut claimed: HashMap<&str, &str> = HashMap::new();
            for (group, profiles) in groups {
                for profile in profiles {
                    if let Some(other) = claimed.insert(profile.as_str(), group.as_str()) {
                        if other != group.as_str() {
                            return Err(Error::Config(format!(
                                "Profile {:?} of {} claimed by both {:?} and {:?}",
                                profile, family, other, group
                            )));
                        }
                    }
                }
            }

            let order = self.group_order.get(family).ok_or_else(|| {
                Error::Config(format!("No default group order configured for {}", family))
            })?;
            for group in order {
                if !groups.contains_key(group) {
                    return Err(Error::Config(format!(
                        "Group order for {} names unknown group {:?}",
                        family, group
                    )));
                }
            }
        }

        for family in self.group_order.keys() {
            if !self.tables.contains_key(family) {
                return Err(Error::Config(format!(
                    "Group order configured for {} but it has no profile table",
                    family
                )));
            }
        }

        for group in self.group_hdcp.keys() {
            let known = self
                .tables
                .values()
                .any(|groups| groups.contains_key(group));
            if !known {
                return Err(Error::Config(format!(
                    "HDCP floor configured for unknown group {:?}",
                    group
                )));
            }
        }

        Ok(())
    }
}

/// Constraints a caller places on profile selection.
#[derive(Debug, Clone)]
pub struct Constraints {
    /// DRM system the decryption module speaks.
    pub drm_system: DrmSystem,
    /// Highest HDCP version the output path can engage, when restricted.
    pub hdcp_level: Option<HdcpVersion>,
    /// Explicit group selection overriding the default preference order.
    pub groups: Option<Vec<String>>,
}

impl Constraints {
    /// Unrestricted constraints for a DRM system.
    pub fn for_system(drm_system: DrmSystem) -> Self {
        Self {
            drm_system,
            hdcp_level: None,
            groups: None,
        }
    }
}

/// Produces ordered, deduplicated candidate profile lists.
#[derive(Debug)]
pub struct ProfileSelector<'a> {
    tables: &'a ProfileTables,
    policy: &'a DrmPolicy,
}

impl<'a> ProfileSelector<'a> {
    /// Create a selector over a service's profile tables and DRM policy.
    pub fn new(tables: &'a ProfileTables, policy: &'a DrmPolicy) -> Self {
        Self { tables, policy }
    }

    /// Select the ordered candidate profiles for a track family.
    ///
    /// Groups are taken from `constraints.groups` when given, otherwise from
    /// the configured default order. Within-group order is preserved exactly
    /// as configured; later duplicates are dropped. The output order is the
    /// caller's fallback retry order. An empty candidate list is never
    /// returned; it becomes [`Error::NoEligibleProfile`].
    pub fn select(&self, family: TrackFamily, constraints: &Constraints) -> Result<Vec<String>> {
        if constraints.drm_system != self.policy.system {
            return Err(Error::NoEligibleProfile {
                family: family.to_string(),
                reason: format!(
                    "service serves {} content, not {}",
                    self.policy.system, constraints.drm_system
                ),
            });
        }

        let Some(table) = self.tables.tables.get(&family) else {
            return Err(Error::NoEligibleProfile {
                family: family.to_string(),
                reason: "no profiles configured for this family".to_string(),
            });
        };

        // Group order: the constraint's, deduplicated to first occurrence
        // with unknown groups skipped, or the configured default.
        let groups: Vec<&str> = match &constraints.groups {
            Some(requested) => {
                let mut seen = HashSet::new();
                requested
                    .iter()
                    .map(String::as_str)
                    .filter(|g| table.contains_key(*g) && seen.insert(*g))
                    .collect()
            }
            None => self
                .tables
                .group_order
                .get(&family)
                .ok_or_else(|| {
                    Error::Config(format!("No default group order configured for {}", family))
                })?
                .iter()
                .map(String::as_str)
                .collect(),
        };

        let mut candidates: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut hdcp_filtered = None;
        for group in groups {
            // A group's profiles share its HDCP floor; a floor above the
            // allowed level drops the whole group for video families.
            if family.is_video() {
                if let (Some(level), Some(floor)) =
                    (constraints.hdcp_level, self.tables.group_hdcp.get(group))
                {
                    if *floor > level {
                        hdcp_filtered = Some(level);
                        tracing::debug!(
                            family = %family,
                            group,
                            floor = %floor,
                            level = %level,
                            "group dropped by HDCP constraint"
                        );
                        continue;
                    }
                }
            }

            if let Some(profiles) = table.get(group) {
                for profile in profiles {
                    if seen.insert(profile) {
                        candidates.push(profile.clone());
                    }
                }
            }
        }

        if candidates.is_empty() {
            let reason = if let Some(level) = hdcp_filtered {
                format!("HDCP level {} excludes every configured group", level)
            } else {
                "requested groups match no configured profiles".to_string()
            };
            return Err(Error::NoEligibleProfile {
                family: family.to_string(),
                reason,
            });
        }

        Ok(candidates)
    }
}
