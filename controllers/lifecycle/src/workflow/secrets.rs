//! Cluster secrets
//!
//! Resolving the kubeconfig context is the only gate; there is no separate
//! cluster existence check.

use super::report;
use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use tracing::info;

impl LifecycleController {
    /// Create or replace secret `name`.
    pub async fn add_secret(&self, name: &str, value: &str) -> bool {
        report(self.try_add_secret(name, value).await)
    }

    /// Delete secret `name`; a missing secret is a failure.
    pub async fn delete_secret(&self, name: &str) -> bool {
        report(self.try_delete_secret(name).await)
    }

    async fn try_add_secret(&self, name: &str, value: &str) -> Result<(), LifecycleError> {
        let context = self.config_context().await?;
        self.cluster.add_secret(&context, name, value).await?;
        info!("Secret {} added to cluster {}", name, self.identity.cluster_name());
        Ok(())
    }

    async fn try_delete_secret(&self, name: &str) -> Result<(), LifecycleError> {
        let context = self.config_context().await?;
        self.cluster.delete_secret(&context, name).await?;
        info!("Secret {} deleted from cluster {}", name, self.identity.cluster_name());
        Ok(())
    }
}
