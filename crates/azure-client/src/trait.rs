//! AzureClient trait for mocking
//!
//! This trait abstracts the Azure control plane so the lifecycle workflows
//! can be unit tested without a subscription. The concrete
//! [`AzureCliClient`](crate::AzureCliClient) implements it by shelling out
//! to `az`; tests use [`MockAzureClient`](crate::MockAzureClient).

use crate::error::AzureError;
use crate::models::{Account, ResourceSummary};
use cluster_model::{BackendStorage, ClusterIdentity, CoreUsage, CredentialBundle, QuotaRequest};
use std::path::Path;

/// Trait for Azure control plane operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait AzureClientTrait: Send + Sync {
    // Session gate

    /// Fail with [`AzureError::NotLoggedIn`] unless a usable session exists.
    async fn ensure_session(&self) -> Result<(), AzureError>;

    /// Register the resource providers the cluster depends on.
    async fn ensure_resource_providers(&self, region: &str) -> Result<(), AzureError>;

    /// Regional compute usage report.
    async fn core_usage(&self, region: &str) -> Result<Vec<CoreUsage>, AzureError>;

    /// Check `request` against the regional usage report.
    async fn verify_cores(&self, region: &str, request: QuotaRequest) -> Result<(), AzureError> {
        let usages = self.core_usage(region).await?;
        request.check(region, &usages)?;
        Ok(())
    }

    // Identity

    /// Display name of the signed-in principal.
    async fn current_user_name(&self) -> Result<String, AzureError>;

    /// Active subscription and tenant.
    async fn account(&self) -> Result<Account, AzureError>;

    // Cluster

    /// Whether the managed cluster of `identity` exists.
    async fn cluster_exists(&self, identity: &ClusterIdentity) -> Result<bool, AzureError>;

    /// Write fresh cluster credentials to `kubeconfig`, converted for non-interactive login.
    async fn refresh_cluster_credentials(
        &self,
        identity: &ClusterIdentity,
        kubeconfig: &Path,
    ) -> Result<(), AzureError>;

    // Storage and registry

    /// Create (or reuse) the durable state backend for `region`.
    async fn ensure_state_backend(&self, region: &str) -> Result<BackendStorage, AzureError>;

    /// Admin credentials of a managed registry as `(username, password)`.
    async fn registry_credentials(
        &self,
        registry: &CredentialBundle,
    ) -> Result<(String, String), AzureError>;

    /// Connection string of a storage account in the cluster's resource group.
    async fn storage_connection_string(
        &self,
        identity: &ClusterIdentity,
        storage_account: &str,
    ) -> Result<Option<String>, AzureError>;

    /// Upload `source` as blob `destination`, overwriting any existing blob.
    async fn upload_file(
        &self,
        source: &Path,
        connection_string: &str,
        container: &str,
        destination: &str,
    ) -> Result<(), AzureError>;

    // Teardown primitives

    /// Whether `resource_group` exists.
    async fn resource_group_exists(&self, resource_group: &str) -> Result<bool, AzureError>;

    /// Create `resource_group` in `region`.
    async fn create_resource_group(&self, resource_group: &str, region: &str)
    -> Result<(), AzureError>;

    /// Resources inside `resource_group`.
    async fn list_resources(&self, resource_group: &str)
    -> Result<Vec<ResourceSummary>, AzureError>;

    /// Delete resources by id; a no-op for an empty list.
    async fn delete_resources(&self, ids: &[String]) -> Result<(), AzureError>;

    /// Delete `resource_group` and everything left in it.
    async fn delete_resource_group(&self, resource_group: &str) -> Result<(), AzureError>;
}
