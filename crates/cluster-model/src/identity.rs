//! Cluster identity and naming rules
//!
//! The cluster name ends up inside a DNS label together with a checksum
//! suffix and a protocol suffix, so its length is bounded well below the
//! 63 characters a label allows.

use crate::constants::WORKSPACE_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Maximum DNS label length.
const DNS_LABEL_MAX: usize = 63;
/// Hyphens separating the name from its suffixes.
const HYPHEN_SEPARATORS: usize = 2;
/// Length of the checksum appended to the name.
const CHECKSUM_SUFFIX_LEN: usize = 6;
/// Length of the `dns` suffix.
const PROTOCOL_SUFFIX_LEN: usize = 3;

/// Longest accepted cluster name (52).
pub const MAX_CLUSTER_NAME_LEN: usize =
    DNS_LABEL_MAX - HYPHEN_SEPARATORS - CHECKSUM_SUFFIX_LEN - PROTOCOL_SUFFIX_LEN;

/// Checks the cluster name against the DNS length limit.
///
/// Logs an error and returns `false` when the name is too long. Has no other
/// side effects; callers must run it before any resource-creating call.
pub fn validate_name(name: &str) -> bool {
    if name.chars().count() > MAX_CLUSTER_NAME_LEN {
        error!(
            "Cluster name is too long. Please use a shorter name (max {} characters)",
            MAX_CLUSTER_NAME_LEN
        );
        return false;
    }
    true
}

/// Normalizes a region display name ("East US") to its canonical form ("eastus").
pub fn normalize_region(region: &str) -> String {
    region
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Identity of the cluster a single invocation operates on.
///
/// Built once from CLI input and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    cluster_name: String,
    resource_group: String,
    region: String,
}

impl ClusterIdentity {
    /// Create an identity; the region is normalized on the way in.
    pub fn new(
        cluster_name: impl Into<String>,
        resource_group: impl Into<String>,
        region: &str,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            resource_group: resource_group.into(),
            region: normalize_region(region),
        }
    }

    /// Cluster name
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Resource group holding every resource of the cluster
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Canonical region name (may be empty for region-less actions)
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Whether the cluster name fits the DNS length limit.
    pub fn has_valid_name(&self) -> bool {
        validate_name(&self.cluster_name)
    }

    /// Name of the infrastructure workspace scoped to this identity.
    pub fn workspace_name(&self) -> String {
        format!(
            "{}-{}-{}",
            WORKSPACE_PREFIX, self.cluster_name, self.resource_group
        )
    }
}

impl fmt::Display for ClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.cluster_name)
    }
}
