//! Compute core quota arithmetic
//!
//! Setup must prove the subscription has room for the requested topology
//! before any infrastructure call. On an update the cores already held by
//! the existing node pools are credited back.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Cores of one worker node VM.
pub const WORKER_VM_CORES: u64 = 8;
/// Cores of one default (system) pool node VM.
pub const DEFAULT_VM_CORES: u64 = 4;
/// Nodes in the default pool.
pub const DEFAULT_NODE_COUNT: u64 = 1;
/// Regional total vCPU quota name.
pub const REGIONAL_CORES_QUOTA: &str = "cores";
/// VM family quota both pools draw from.
pub const VM_FAMILY_QUOTA: &str = "standardDSv3Family";

/// One line of the regional usage report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreUsage {
    /// Quota name (e.g. `cores`, `standardDSv3Family`)
    pub name: String,
    /// Cores in use
    pub current: u64,
    /// Cores allowed
    pub limit: u64,
}

impl CoreUsage {
    /// Cores still available under this quota
    pub fn available(&self) -> u64 {
        self.limit.saturating_sub(self.current)
    }
}

/// Quota shortfall for one quota line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "quota '{quota}' in {region} allows {limit} cores, {current} are in use and {required} more are required"
)]
pub struct QuotaShortfall {
    /// Region checked
    pub region: String,
    /// Quota name
    pub quota: String,
    /// Quota limit
    pub limit: u64,
    /// Cores in use
    pub current: u64,
    /// Additional cores the topology needs
    pub required: u64,
}

/// Requested topology versus what already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRequest {
    /// Upper bound of the worker pool
    pub max_worker_nodes: u32,
    /// Cores held by the existing worker pool (0 on fresh create)
    pub existing_worker_cores: u64,
    /// Cores held by the existing default pool (0 on fresh create)
    pub existing_default_cores: u64,
}

impl QuotaRequest {
    /// Fresh create: nothing exists yet.
    pub fn fresh(max_worker_nodes: u32) -> Self {
        Self {
            max_worker_nodes,
            existing_worker_cores: 0,
            existing_default_cores: 0,
        }
    }

    /// Additional cores the topology needs beyond what it already holds.
    pub fn required_cores(&self) -> u64 {
        let wanted = u64::from(self.max_worker_nodes) * WORKER_VM_CORES
            + DEFAULT_NODE_COUNT * DEFAULT_VM_CORES;
        let existing = self
            .existing_worker_cores
            .saturating_add(self.existing_default_cores);
        wanted.saturating_sub(existing)
    }

    /// Check the requirement against the regional and VM family quotas.
    ///
    /// Quota lines missing from the report are not checked.
    pub fn check(&self, region: &str, usages: &[CoreUsage]) -> Result<(), QuotaShortfall> {
        let required = self.required_cores();
        for quota in [REGIONAL_CORES_QUOTA, VM_FAMILY_QUOTA] {
            let Some(usage) = usages.iter().find(|u| u.name.eq_ignore_ascii_case(quota)) else {
                debug!("No usage reported for quota {} in {}", quota, region);
                continue;
            };
            if usage.available() < required {
                return Err(QuotaShortfall {
                    region: region.to_string(),
                    quota: quota.to_string(),
                    limit: usage.limit,
                    current: usage.current,
                    required,
                });
            }
        }
        Ok(())
    }
}
