//! ClusterClient trait for mocking

use crate::error::ClusterClientError;

/// Trait for operations against the provisioned cluster
///
/// `context` is the kubeconfig context name; it is opaque to callers.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Public service URL from the ingress, `None` when no host is published.
    async fn url_from_ingress(
        &self,
        context: &str,
        cluster_name: &str,
    ) -> Result<Option<String>, ClusterClientError>;

    /// Create or replace secret `name` holding `value`.
    async fn add_secret(
        &self,
        context: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ClusterClientError>;

    /// Delete secret `name`.
    async fn delete_secret(&self, context: &str, name: &str) -> Result<(), ClusterClientError>;
}
