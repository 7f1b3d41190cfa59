//! Teardown
//!
//! Deletes every resource in the cluster's resource group and, when asked,
//! the group itself. A missing group is a no-op. The cached kubeconfig and
//! local Terraform state are cleared whatever happened remotely.

use super::transition;
use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use cluster_model::{LifecyclePhase, LifecycleState};
use tracing::{error, info};

impl LifecycleController {
    /// Destroy the cluster; `destroy_rg` also deletes the resource group.
    pub async fn destroy(&self, destroy_rg: bool) -> bool {
        if self.identity.resource_group().is_empty() {
            error!(
                "{}",
                LifecycleError::Precondition(
                    "A resource group is required to destroy a cluster (--resource-group)"
                        .to_string()
                )
            );
            return false;
        }

        let mut state = LifecycleState::new(false);
        transition(&mut state, LifecyclePhase::Destroying);
        info!("Destroying cluster...");

        let remote = self.delete_remote(destroy_rg).await;
        self.host.clear_local_state();
        transition(&mut state, LifecyclePhase::Destroyed);

        match remote {
            Ok(()) => {
                info!("Cluster destroyed.");
                true
            }
            Err(e) => {
                error!("{}", e);
                false
            }
        }
    }

    async fn delete_remote(&self, destroy_rg: bool) -> Result<(), LifecycleError> {
        let resource_group = self.identity.resource_group();
        info!("Verifying if group still exists...");
        if !self.azure.resource_group_exists(resource_group).await? {
            info!("Resource group {} does not exist, nothing to delete", resource_group);
            return Ok(());
        }

        info!("Group exists. Requesting destruction (this may take some time)...");
        let ids: Vec<String> = self
            .azure
            .list_resources(resource_group)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if !ids.is_empty() {
            self.azure.delete_resources(&ids).await?;
        }

        if destroy_rg {
            info!("Destroying resource group {}...", resource_group);
            self.azure.delete_resource_group(resource_group).await?;
        }
        Ok(())
    }
}
