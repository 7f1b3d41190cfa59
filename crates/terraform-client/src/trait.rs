//! Provisioner trait for mocking
//!
//! The lifecycle workflows drive the layers only through this trait, so the
//! rollback decisions can be tested without Terraform or a subscription.

use crate::error::TerraformError;
use crate::models::{ClusterInputs, InfraInputs, ResourceGroupInputs, ServicesInputs};
use cluster_model::{BackendStorage, ClusterIdentity, LayerOutput};

/// Layer provisioning operations
///
/// `ensure_*` operations are idempotent and must run in topology order.
/// Query operations are read-only and safe to repeat.
#[async_trait::async_trait]
pub trait ProvisionerTrait: Send + Sync {
    /// Scope the remote-state layers to `identity`; returns the workspace name.
    async fn acquire_workspace(&self, identity: &ClusterIdentity) -> Result<String, TerraformError>;

    /// Leave the scoped workspace in every layer that entered it.
    async fn release_workspace(&self) -> Result<(), TerraformError>;

    /// Ensure the resource group exists; `true` when this call created it.
    async fn ensure_resource_group(
        &self,
        inputs: &ResourceGroupInputs,
    ) -> Result<bool, TerraformError>;

    /// Create or locate the durable state backend.
    async fn ensure_backend_storage(&self, region: &str) -> Result<BackendStorage, TerraformError>;

    /// Network, public IP, key vault and user storage.
    async fn ensure_infra(
        &self,
        inputs: &InfraInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError>;

    /// The managed Kubernetes cluster.
    async fn ensure_k8s_cluster(
        &self,
        inputs: &ClusterInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError>;

    /// In-cluster services.
    async fn ensure_services(
        &self,
        inputs: &ServicesInputs,
        cleanup_state: bool,
    ) -> Result<(), TerraformError>;

    /// Cores held by the worker and default pools as `(worker, default)`; zeros when unknown.
    async fn get_current_core_count(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<(u64, u64), TerraformError>;

    /// User-file storage account recorded by the infra layer.
    async fn get_storage_account_name(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError>;

    /// Kubernetes config context recorded by the infra layer.
    async fn get_kubernetes_config_context(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError>;

    /// Service URL derived from the recorded public FQDN.
    async fn get_url_from_terraform_output(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError>;
}
