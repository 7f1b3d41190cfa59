//! Layer inputs
//!
//! One struct per Terraform module. Inputs that come from an earlier layer
//! are pulled out of its [`LayerOutput`] by exact key, so a missing output
//! fails before the next module runs.

use cluster_model::keys;
use cluster_model::{BackendStorage, CredentialBundle, LayerOutput, ModelError};
use std::fmt;
use std::path::PathBuf;

/// Named Terraform variables of one layer
pub type Vars = Vec<(&'static str, String)>;

/// Inputs of the resource group layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupInputs {
    /// Tenant id
    pub tenant_id: String,
    /// Subscription id
    pub subscription_id: String,
    /// Canonical region
    pub region: String,
    /// Cluster name
    pub cluster_name: String,
    /// Resource group to ensure
    pub resource_group: String,
}

impl ResourceGroupInputs {
    /// Terraform variables
    pub fn to_vars(&self) -> Vars {
        vec![
            ("tenant_id", self.tenant_id.clone()),
            ("subscription_id", self.subscription_id.clone()),
            ("location", self.region.clone()),
            ("prefix", self.cluster_name.clone()),
            ("resource_group_name", self.resource_group.clone()),
        ]
    }
}

/// Inputs of the infra layer (network, public IP, key vault, user storage, node pools)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraInputs {
    /// Tenant id
    pub tenant_id: String,
    /// Subscription id
    pub subscription_id: String,
    /// Canonical region
    pub region: String,
    /// Cluster name
    pub cluster_name: String,
    /// Resource group
    pub resource_group: String,
    /// Upper bound of the worker pool
    pub max_worker_nodes: u32,
    /// Remote state backend
    pub backend: BackendStorage,
}

impl InfraInputs {
    /// Terraform variables
    pub fn to_vars(&self) -> Vars {
        vec![
            ("tenant_id", self.tenant_id.clone()),
            ("subscription_id", self.subscription_id.clone()),
            ("location", self.region.clone()),
            ("prefix", self.cluster_name.clone()),
            ("resource_group_name", self.resource_group.clone()),
            ("max_worker_nodes", self.max_worker_nodes.to_string()),
        ]
    }
}

/// Inputs of the Kubernetes cluster layer
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterInputs {
    /// Tenant id
    pub tenant_id: String,
    /// Registry and its credentials
    pub registry: CredentialBundle,
    /// Resource group
    pub resource_group: String,
    /// Signed-in user, granted cluster admin
    pub current_user_name: String,
    /// Contact for the TLS certificate issuer
    pub certificate_email: String,
    /// Infra outputs consumed by the cluster
    pub kubernetes_config_context: String,
    /// Public IP address of the ingress
    pub public_ip_address: String,
    /// FQDN of the public IP
    pub public_ip_fqdn: String,
    /// DNS label of the public IP
    pub public_ip_dns: String,
    /// Key vault name
    pub keyvault_name: String,
    /// Application id of the cluster identity
    pub application_id: String,
    /// Access key of the user-file storage
    pub storage_connection_key: String,
    /// User-file storage account
    pub storage_account_name: String,
    /// User-file container
    pub userfile_container_name: String,
    /// Remote state backend
    pub backend: BackendStorage,
}

impl ClusterInputs {
    /// Assemble from the infra outputs; every consumed key is required.
    pub fn from_infra(
        infra: &LayerOutput,
        tenant_id: impl Into<String>,
        registry: CredentialBundle,
        resource_group: impl Into<String>,
        current_user_name: impl Into<String>,
        certificate_email: impl Into<String>,
        backend: BackendStorage,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            tenant_id: tenant_id.into(),
            registry,
            resource_group: resource_group.into(),
            current_user_name: current_user_name.into(),
            certificate_email: certificate_email.into(),
            kubernetes_config_context: infra.require(keys::KUBERNETES_CONFIG_CONTEXT)?.to_string(),
            public_ip_address: infra.require(keys::PUBLIC_IP_ADDRESS)?.to_string(),
            public_ip_fqdn: infra.require(keys::PUBLIC_IP_FQDN)?.to_string(),
            public_ip_dns: infra.require(keys::PUBLIC_IP_DNS)?.to_string(),
            keyvault_name: infra.require(keys::KEYVAULT_NAME)?.to_string(),
            application_id: infra.require(keys::APPLICATION_ID)?.to_string(),
            storage_connection_key: infra.require(keys::STORAGE_CONNECTION_KEY)?.to_string(),
            storage_account_name: infra.require(keys::STORAGE_ACCOUNT_NAME)?.to_string(),
            userfile_container_name: infra.require(keys::USERFILE_CONTAINER_NAME)?.to_string(),
            backend,
        })
    }

    /// Terraform variables
    pub fn to_vars(&self) -> Vars {
        vec![
            ("tenant_id", self.tenant_id.clone()),
            ("registry", self.registry.registry_path.clone()),
            ("registry_username", self.registry.username().to_string()),
            ("registry_password", self.registry.password().to_string()),
            ("resource_group_name", self.resource_group.clone()),
            ("current_user_name", self.current_user_name.clone()),
            ("certificate_email", self.certificate_email.clone()),
            ("kubernetes_config_context", self.kubernetes_config_context.clone()),
            ("public_ip_address", self.public_ip_address.clone()),
            ("public_ip_fqdn", self.public_ip_fqdn.clone()),
            ("public_ip_dns", self.public_ip_dns.clone()),
            ("keyvault_name", self.keyvault_name.clone()),
            ("application_id", self.application_id.clone()),
            ("storage_connection_key", self.storage_connection_key.clone()),
            ("storage_account_name", self.storage_account_name.clone()),
            ("userfile_container_name", self.userfile_container_name.clone()),
        ]
    }
}

impl fmt::Debug for ClusterInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterInputs")
            .field("registry", &self.registry)
            .field("resource_group", &self.resource_group)
            .field("kubernetes_config_context", &self.kubernetes_config_context)
            .field("public_ip_fqdn", &self.public_ip_fqdn)
            .field("storage_account_name", &self.storage_account_name)
            .finish_non_exhaustive()
    }
}

/// Inputs of the services layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesInputs {
    /// Cluster name
    pub cluster_name: String,
    /// Registry the images are pulled from
    pub registry_path: String,
    /// Kubeconfig written by the cluster layer
    pub kubeconfig_path: PathBuf,
    /// Context inside the kubeconfig
    pub kubernetes_config_context: String,
    /// Node pool the workers are scheduled on
    pub worker_node_pool_name: String,
    /// FQDN served by the ingress
    pub public_ip_fqdn: String,
    /// Image name prefix
    pub image_prefix: String,
    /// Image tag
    pub image_tag: String,
    /// Volume claim shared by the services
    pub shared_resource_pv_claim_name: String,
    /// Number of worker replicas
    pub worker_replicas: u32,
    /// Log level of the services
    pub log_level: String,
    /// Remote state backend
    pub backend: BackendStorage,
}

/// Deployment parameters of the services layer that do not come from other layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Image name prefix
    pub image_prefix: String,
    /// Image tag
    pub image_tag: String,
    /// Number of worker replicas
    pub worker_replicas: u32,
    /// Log level of the services
    pub log_level: String,
}

impl ServicesInputs {
    /// Assemble from the infra and cluster outputs; every consumed key is required.
    pub fn from_outputs(
        infra: &LayerOutput,
        cluster: &LayerOutput,
        cluster_name: impl Into<String>,
        registry_path: impl Into<String>,
        kubeconfig_path: PathBuf,
        settings: ServiceSettings,
        backend: BackendStorage,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            cluster_name: cluster_name.into(),
            registry_path: registry_path.into(),
            kubeconfig_path,
            kubernetes_config_context: infra.require(keys::KUBERNETES_CONFIG_CONTEXT)?.to_string(),
            worker_node_pool_name: infra.require(keys::WORKER_NODE_POOL_NAME)?.to_string(),
            public_ip_fqdn: infra.require(keys::PUBLIC_IP_FQDN)?.to_string(),
            shared_resource_pv_claim_name: cluster
                .require(keys::SHARED_RESOURCE_PV_CLAIM_NAME)?
                .to_string(),
            image_prefix: settings.image_prefix,
            image_tag: settings.image_tag,
            worker_replicas: settings.worker_replicas,
            log_level: settings.log_level,
            backend,
        })
    }

    /// Terraform variables
    pub fn to_vars(&self) -> Vars {
        vec![
            ("prefix", self.cluster_name.clone()),
            ("registry", self.registry_path.clone()),
            ("kubeconfig_location", self.kubeconfig_path.display().to_string()),
            ("kubernetes_config_context", self.kubernetes_config_context.clone()),
            ("worker_node_pool_name", self.worker_node_pool_name.clone()),
            ("public_ip_fqdn", self.public_ip_fqdn.clone()),
            ("image_prefix", self.image_prefix.clone()),
            ("image_tag", self.image_tag.clone()),
            ("shared_resource_pv_claim_name", self.shared_resource_pv_claim_name.clone()),
            ("worker_replicas", self.worker_replicas.to_string()),
            ("farmvibes_log_level", self.log_level.clone()),
        ]
    }
}
