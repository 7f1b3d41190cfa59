//! Service URL discovery
//!
//! The live ingress is the source of truth. When it yields nothing the URL
//! recorded in the infra layer's outputs is used instead and flagged as
//! possibly stale. Whichever URL is found is persisted without quotes.

use super::report;
use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use cluster_model::PersistedEndpoint;
use tracing::{debug, info, warn};

/// URL found by [`LifecycleController::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUrl {
    /// Persisted value
    pub url: String,
    /// Read from provisioner outputs instead of the live ingress
    pub stale: bool,
}

impl LifecycleController {
    /// Discover, persist and report the service URL.
    pub async fn status(&self) -> bool {
        report(self.discover_url().await)
    }

    pub(crate) async fn discover_url(&self) -> Result<DiscoveredUrl, LifecycleError> {
        if self.host.is_restricted_context() {
            return Err(LifecycleError::Precondition(
                "Show URL command does not run correctly when run within WSL due to AZ context \
                 issues. Execute this command with the 'status' action on your Windows prompt \
                 to get the URL"
                    .to_string(),
            ));
        }

        debug!("Refreshing AKS credentials...");
        if let Err(e) = self
            .azure
            .refresh_cluster_credentials(&self.identity, &self.host.kubeconfig_path())
            .await
        {
            warn!("Failed to refresh AKS credentials: {}", e);
        }

        info!(
            "Getting URL from ingress for cluster {}...",
            self.identity.cluster_name()
        );
        let live = self.url_from_ingress().await;
        let (url, stale) = match live {
            Some(url) => (Some(url), false),
            None => (self.url_from_outputs().await, true),
        };
        let url = url.ok_or(LifecycleError::NoUrl)?;

        let endpoint = self.host.endpoint();
        let previous = endpoint.load().unwrap_or_else(|e| {
            debug!("Ignoring unreadable {}: {}", endpoint.path().display(), e);
            None
        });
        let url = endpoint.store(&url)?;
        if let Some(previous) = previous.filter(|p| PersistedEndpoint::normalize(p) != url) {
            info!("Service URL changed from {} to {}", previous, url);
        }

        info!("URL for your AKS Cluster is: {}", url);
        if stale {
            warn!(
                "We failed to get the URL from the cluster. The URL above might be incorrect, \
                 as we might have read it from old Terraform state. Please check the URL above \
                 and if it's incorrect, please run `aks-remote update`."
            );
        }
        Ok(DiscoveredUrl { url, stale })
    }

    async fn url_from_ingress(&self) -> Option<String> {
        let context = match self.config_context().await {
            Ok(context) => context,
            Err(e) => {
                debug!("No live discovery: {}", e);
                return None;
            }
        };
        match self
            .cluster
            .url_from_ingress(&context, self.identity.cluster_name())
            .await
        {
            Ok(url) => url.filter(|u| !PersistedEndpoint::normalize(u).is_empty()),
            Err(e) => {
                warn!("Failed to read ingress of {}: {}", self.identity, e);
                None
            }
        }
    }

    async fn url_from_outputs(&self) -> Option<String> {
        match self
            .provisioner
            .get_url_from_terraform_output(&self.identity)
            .await
        {
            Ok(url) => url.filter(|u| !PersistedEndpoint::normalize(u).is_empty()),
            Err(e) => {
                warn!("Failed to read URL from Terraform output: {}", e);
                None
            }
        }
    }
}
