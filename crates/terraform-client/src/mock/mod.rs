//! Mock provisioner for unit testing
//!
//! Returns scripted layer outputs, records every call by operation name and
//! tracks whether a workspace is currently held, so tests can assert that
//! the workspace is released on every exit path.

use crate::error::TerraformError;
use crate::models::{ClusterInputs, InfraInputs, ResourceGroupInputs, ServicesInputs};
use crate::provisioner_trait::ProvisionerTrait;
use cluster_model::keys;
use cluster_model::{BackendStorage, ClusterIdentity, Layer, LayerOutput};
use host_env::ToolError;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct MockState {
    resource_group_exists: bool,
    backend: BackendStorage,
    infra: LayerOutput,
    cluster: LayerOutput,
    core_count: (u64, u64),
    workspace: Option<String>,
    failing: BTreeSet<String>,
    calls: Vec<String>,
    cleanup_flags: Vec<(String, bool)>,
    services: Vec<ServicesInputs>,
}

/// Mock provisioner for testing
#[derive(Debug, Clone)]
pub struct MockProvisioner {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

/// Infra outputs of a healthy cluster named `vibes`
pub fn infra_outputs() -> LayerOutput {
    LayerOutput::from_pairs(
        Layer::Infra,
        [
            (keys::KUBERNETES_CONFIG_CONTEXT, "vibes-ctx"),
            (keys::PUBLIC_IP_ADDRESS, "20.0.0.1"),
            (keys::PUBLIC_IP_FQDN, "vibes.eastus.cloudapp.azure.com"),
            (keys::PUBLIC_IP_DNS, "vibes"),
            (keys::KEYVAULT_NAME, "vibes-kv"),
            (keys::APPLICATION_ID, "app-id"),
            (keys::STORAGE_CONNECTION_KEY, "conn-key"),
            (keys::STORAGE_ACCOUNT_NAME, "vibesstorage"),
            (keys::USERFILE_CONTAINER_NAME, "userfiles"),
            (keys::WORKER_NODE_POOL_NAME, "workers"),
        ],
    )
}

impl MockProvisioner {
    /// Provisioner whose layers all succeed
    pub fn new() -> Self {
        let state = MockState {
            resource_group_exists: false,
            backend: BackendStorage {
                storage_name: "aksremotestate".to_string(),
                container_name: "tfstate".to_string(),
                access_key: "state-key".to_string(),
            },
            infra: infra_outputs(),
            cluster: LayerOutput::from_pairs(
                Layer::KubernetesCluster,
                [(keys::SHARED_RESOURCE_PV_CLAIM_NAME, "shared-claim")],
            ),
            core_count: (0, 0),
            workspace: None,
            failing: BTreeSet::new(),
            calls: Vec::new(),
            cleanup_flags: Vec::new(),
            services: Vec::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, MockState>, TerraformError> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(TerraformError::Tool(ToolError::Failed {
                tool: "terraform".to_string(),
                command: operation.to_string(),
                code: Some(1),
                stderr: format!("Error: mock failure in {operation}"),
            }));
        }
        Ok(state)
    }

    // Setup

    /// Make `operation` (a trait method name) fail
    pub fn failing(self, operation: &str) -> Self {
        self.lock().failing.insert(operation.to_string());
        self
    }

    /// The resource group already exists before setup
    pub fn with_existing_resource_group(self) -> Self {
        self.lock().resource_group_exists = true;
        self
    }

    /// Replace the backend returned by `ensure_backend_storage`
    pub fn with_backend(self, backend: BackendStorage) -> Self {
        self.lock().backend = backend;
        self
    }

    /// Replace the infra outputs (also used by the queries)
    pub fn with_infra_outputs(self, outputs: LayerOutput) -> Self {
        self.lock().infra = outputs;
        self
    }

    /// Cores held by the current pools
    pub fn with_core_count(self, worker: u64, default: u64) -> Self {
        self.lock().core_count = (worker, default);
        self
    }

    // Inspection

    /// Names of every trait call so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How often `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Whether a workspace is currently held
    pub fn holds_workspace(&self) -> bool {
        self.lock().workspace.is_some()
    }

    /// `cleanup_state` passed to each workspace layer
    pub fn cleanup_flags(&self) -> Vec<(String, bool)> {
        self.lock().cleanup_flags.clone()
    }

    /// Inputs handed to the services layer
    pub fn services_inputs(&self) -> Vec<ServicesInputs> {
        self.lock().services.clone()
    }
}

#[async_trait::async_trait]
impl ProvisionerTrait for MockProvisioner {
    async fn acquire_workspace(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<String, TerraformError> {
        let mut state = self.enter("acquire_workspace")?;
        let workspace = identity.workspace_name();
        state.workspace = Some(workspace.clone());
        Ok(workspace)
    }

    async fn release_workspace(&self) -> Result<(), TerraformError> {
        self.enter("release_workspace")?.workspace = None;
        Ok(())
    }

    async fn ensure_resource_group(
        &self,
        _inputs: &ResourceGroupInputs,
    ) -> Result<bool, TerraformError> {
        let mut state = self.enter("ensure_resource_group")?;
        let created = !state.resource_group_exists;
        state.resource_group_exists = true;
        Ok(created)
    }

    async fn ensure_backend_storage(
        &self,
        _region: &str,
    ) -> Result<BackendStorage, TerraformError> {
        Ok(self.enter("ensure_backend_storage")?.backend.clone())
    }

    async fn ensure_infra(
        &self,
        _inputs: &InfraInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError> {
        let mut state = self.enter("ensure_infra")?;
        if state.workspace.is_none() {
            return Err(TerraformError::NoWorkspace);
        }
        state.cleanup_flags.push(("infra".to_string(), cleanup_state));
        Ok(state.infra.clone())
    }

    async fn ensure_k8s_cluster(
        &self,
        _inputs: &ClusterInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError> {
        let mut state = self.enter("ensure_k8s_cluster")?;
        if state.workspace.is_none() {
            return Err(TerraformError::NoWorkspace);
        }
        state.cleanup_flags.push(("kubernetes".to_string(), cleanup_state));
        Ok(state.cluster.clone())
    }

    async fn ensure_services(
        &self,
        inputs: &ServicesInputs,
        cleanup_state: bool,
    ) -> Result<(), TerraformError> {
        let mut state = self.enter("ensure_services")?;
        if state.workspace.is_none() {
            return Err(TerraformError::NoWorkspace);
        }
        state.cleanup_flags.push(("services".to_string(), cleanup_state));
        state.services.push(inputs.clone());
        Ok(())
    }

    async fn get_current_core_count(
        &self,
        _identity: &ClusterIdentity,
    ) -> Result<(u64, u64), TerraformError> {
        Ok(self.enter("get_current_core_count")?.core_count)
    }

    async fn get_storage_account_name(
        &self,
        _identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        Ok(self
            .enter("get_storage_account_name")?
            .infra
            .get(keys::STORAGE_ACCOUNT_NAME)
            .map(str::to_string))
    }

    async fn get_kubernetes_config_context(
        &self,
        _identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        Ok(self
            .enter("get_kubernetes_config_context")?
            .infra
            .get(keys::KUBERNETES_CONFIG_CONTEXT)
            .map(str::to_string))
    }

    async fn get_url_from_terraform_output(
        &self,
        _identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        Ok(self
            .enter("get_url_from_terraform_output")?
            .infra
            .get(keys::PUBLIC_IP_FQDN)
            .filter(|fqdn| !fqdn.is_empty())
            .map(|fqdn| format!("https://{fqdn}")))
    }
}
