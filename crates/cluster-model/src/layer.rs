//! Provisioning topology
//!
//! The cluster is built from a fixed, ordered list of infrastructure layers.
//! Each layer's "ensure" step yields a [`LayerOutput`]; later layers read
//! the values they need by exact key.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Output keys produced by the infra and cluster layers.
pub mod keys {
    /// Kubernetes config context of the cluster
    pub const KUBERNETES_CONFIG_CONTEXT: &str = "kubernetes_config_context";
    /// Public IP address of the ingress
    pub const PUBLIC_IP_ADDRESS: &str = "public_ip_address";
    /// Fully qualified domain name of the public IP
    pub const PUBLIC_IP_FQDN: &str = "public_ip_fqdn";
    /// DNS label of the public IP
    pub const PUBLIC_IP_DNS: &str = "public_ip_dns";
    /// Key vault name
    pub const KEYVAULT_NAME: &str = "keyvault_name";
    /// Application (client) id of the cluster identity
    pub const APPLICATION_ID: &str = "application_id";
    /// Access key of the user-file storage account
    pub const STORAGE_CONNECTION_KEY: &str = "storage_connection_key";
    /// Name of the user-file storage account
    pub const STORAGE_ACCOUNT_NAME: &str = "storage_account_name";
    /// Blob container for user files
    pub const USERFILE_CONTAINER_NAME: &str = "userfile_container_name";
    /// Name of the worker node pool
    pub const WORKER_NODE_POOL_NAME: &str = "worker_node_pool_name";
    /// Cores currently allocated to the worker pool
    pub const WORKER_NODE_POOL_CORES: &str = "worker_node_pool_cores";
    /// Cores currently allocated to the default pool
    pub const DEFAULT_NODE_POOL_CORES: &str = "default_node_pool_cores";
    /// Persistent volume claim shared by the services
    pub const SHARED_RESOURCE_PV_CLAIM_NAME: &str = "shared_resource_pv_claim_name";
}

/// One infrastructure layer, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    /// Resource group holding everything
    ResourceGroup,
    /// Durable state backend of the infrastructure tool
    StorageBackend,
    /// Network, public IP, key vault, user storage, node pools
    Infra,
    /// The managed Kubernetes cluster
    KubernetesCluster,
    /// In-cluster services (ingress, workers)
    Services,
}

impl Layer {
    /// All layers in provisioning order.
    pub const ALL: [Layer; 5] = [
        Layer::ResourceGroup,
        Layer::StorageBackend,
        Layer::Infra,
        Layer::KubernetesCluster,
        Layer::Services,
    ];

    /// Stable short name, also used as module directory name.
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::ResourceGroup => "resource_group",
            Layer::StorageBackend => "storage_backend",
            Layer::Infra => "infra",
            Layer::KubernetesCluster => "kubernetes",
            Layer::Services => "services",
        }
    }

    /// Layers that keep their state in the remote backend.
    pub fn uses_remote_backend(self) -> bool {
        matches!(
            self,
            Layer::Infra | Layer::KubernetesCluster | Layer::Services
        )
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named string outputs of one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerOutput {
    layer: Layer,
    values: BTreeMap<String, String>,
}

impl LayerOutput {
    /// Empty output for a layer
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            values: BTreeMap::new(),
        }
    }

    /// Build from key/value pairs
    pub fn from_pairs<K, V, I>(layer: Layer, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            layer,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode the JSON document printed by `terraform output -json`.
    ///
    /// Every entry has the shape `{"value": ..., "type": ..., "sensitive": ...}`.
    /// String values are taken verbatim, anything else is serialized.
    pub fn from_terraform_json(layer: Layer, json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let values = raw
            .into_iter()
            .filter_map(|(key, entry)| {
                let value = entry.get("value")?;
                let rendered = match value {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                Some((key, rendered))
            })
            .collect();
        Ok(Self { layer, values })
    }

    /// Layer that produced these outputs
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Optional lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Lookup that treats a missing key as a fatal precondition failure.
    pub fn require(&self, key: &str) -> Result<&str, ModelError> {
        self.get(key).ok_or_else(|| ModelError::MissingOutput {
            layer: self.layer.to_string(),
            key: key.to_string(),
        })
    }

    /// Number of outputs
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the layer produced no outputs
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
