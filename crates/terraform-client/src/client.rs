//! Terraform provisioner
//!
//! Each layer is a module directory under the modules root. A layer run is
//! `init`, optionally `workspace select`, `apply` and `output -json`, all with
//! `-chdir=<module>` and a per-layer `TF_DATA_DIR` inside the config
//! directory. Inputs are handed over as `TF_VAR_*` variables. The remote
//! backend settings are recorded by `init` in the data directory, so read-only
//! queries work without the caller knowing the backend.

use crate::error::TerraformError;
use crate::models::{ClusterInputs, InfraInputs, ResourceGroupInputs, ServicesInputs, Vars};
use crate::provisioner_trait::ProvisionerTrait;
use azure_client::AzureClientTrait;
use cluster_model::keys;
use cluster_model::{BackendStorage, ClusterIdentity, Layer, LayerOutput};
use host_env::{HostEnvironment, ToolInvocation, ToolRunner};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Workspace every layer returns to on release
const DEFAULT_WORKSPACE: &str = "default";
/// Backend config file Terraform writes into the data directory on `init`
const BACKEND_MARKER: &str = "terraform.tfstate";

#[derive(Debug, Default)]
struct Scope {
    workspace: Option<String>,
    entered: BTreeSet<Layer>,
}

/// Provisioner backed by the `terraform` CLI
pub struct TerraformClient {
    runner: ToolRunner,
    modules_dir: PathBuf,
    state_dir: PathBuf,
    azure: Arc<dyn AzureClientTrait>,
    scope: Mutex<Scope>,
}

impl fmt::Debug for TerraformClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerraformClient")
            .field("modules_dir", &self.modules_dir)
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

impl TerraformClient {
    /// Create a provisioner for the modules and state directories of `host`
    pub fn new(host: &HostEnvironment, azure: Arc<dyn AzureClientTrait>) -> Self {
        Self {
            runner: host.runner(),
            modules_dir: host.terraform_modules_dir().to_path_buf(),
            state_dir: host.terraform_state_dir(),
            azure,
            scope: Mutex::new(Scope::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scope> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn module_dir(&self, layer: Layer) -> PathBuf {
        self.modules_dir.join(layer.as_str())
    }

    fn data_dir(&self, layer: Layer) -> PathBuf {
        self.state_dir.join(layer.as_str())
    }

    fn invocation(&self, layer: Layer, args: &[&str]) -> ToolInvocation {
        ToolInvocation::new("terraform")
            .arg(format!("-chdir={}", self.module_dir(layer).display()))
            .args(args.iter().copied())
            .env("TF_DATA_DIR", self.data_dir(layer).display().to_string())
            .env("TF_IN_AUTOMATION", "1")
    }

    /// Create the layer's data directory, wiping it first when `cleanup_state` is set.
    pub fn prepare_data_dir(
        &self,
        layer: Layer,
        cleanup_state: bool,
    ) -> Result<(), TerraformError> {
        let dir = self.data_dir(layer);
        if cleanup_state && dir.exists() {
            debug!("Cleaning local state of layer {}", layer);
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(())
    }

    /// Backend arguments for `init`: a local state file or the remote container.
    pub fn backend_config_args(
        &self,
        layer: Layer,
        backend: Option<&BackendStorage>,
        local_name: &str,
    ) -> Vec<String> {
        match backend {
            Some(backend) if layer.uses_remote_backend() => vec![
                format!("-backend-config=storage_account_name={}", backend.storage_name),
                format!("-backend-config=container_name={}", backend.container_name),
                format!("-backend-config=access_key={}", backend.access_key),
                format!("-backend-config=key={}.tfstate", layer.as_str()),
            ],
            _ => vec![format!(
                "-backend-config=path={}",
                self.data_dir(layer).join(format!("{local_name}.tfstate")).display()
            )],
        }
    }

    async fn init(
        &self,
        layer: Layer,
        backend: Option<&BackendStorage>,
        local_name: &str,
    ) -> Result<(), TerraformError> {
        let config = self.backend_config_args(layer, backend, local_name);
        let mut args = vec!["init", "-reconfigure", "-input=false"];
        args.extend(config.iter().map(String::as_str));
        self.runner.run(&self.invocation(layer, &args)).await?;
        Ok(())
    }

    async fn select_workspace(
        &self,
        layer: Layer,
        workspace: &str,
        create: bool,
    ) -> Result<(), TerraformError> {
        let args: Vec<&str> = if create {
            vec!["workspace", "select", "-or-create", workspace]
        } else {
            vec!["workspace", "select", workspace]
        };
        self.runner.run(&self.invocation(layer, &args)).await?;
        Ok(())
    }

    async fn apply(&self, layer: Layer, vars: &Vars) -> Result<(), TerraformError> {
        let mut invocation = self.invocation(layer, &["apply", "-auto-approve", "-input=false"]);
        for (name, value) in vars {
            invocation = invocation.env(format!("TF_VAR_{name}"), value.clone());
        }
        info!("Applying layer {}", layer);
        self.runner.run(&invocation).await?;
        Ok(())
    }

    async fn outputs(&self, layer: Layer) -> Result<LayerOutput, TerraformError> {
        let stdout = self
            .runner
            .run(&self.invocation(layer, &["output", "-json"]))
            .await?;
        Ok(LayerOutput::from_terraform_json(layer, &stdout)?)
    }

    /// One full layer run inside the acquired workspace.
    async fn run_layer(
        &self,
        layer: Layer,
        vars: &Vars,
        backend: &BackendStorage,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError> {
        let workspace = self
            .lock()
            .workspace
            .clone()
            .ok_or(TerraformError::NoWorkspace)?;

        let module = self.module_dir(layer);
        if !module.is_dir() {
            return Err(TerraformError::MissingModule {
                layer: layer.to_string(),
                path: module.display().to_string(),
            });
        }

        self.prepare_data_dir(layer, cleanup_state)?;
        self.init(layer, Some(backend), &workspace).await?;
        self.lock().entered.insert(layer);
        self.select_workspace(layer, &workspace, true).await?;
        self.apply(layer, vars).await?;
        self.outputs(layer).await
    }

    /// Outputs of a previously applied layer, `None` when no local state is available.
    async fn query_outputs(
        &self,
        layer: Layer,
        identity: &ClusterIdentity,
    ) -> Result<Option<LayerOutput>, TerraformError> {
        if !self.data_dir(layer).join(BACKEND_MARKER).is_file() {
            debug!("Layer {} has not been initialized locally", layer);
            return Ok(None);
        }
        let workspace = identity.workspace_name();
        if let Err(e) = self.select_workspace(layer, &workspace, false).await {
            debug!("Workspace {} not available for layer {}: {}", workspace, layer, e);
            return Ok(None);
        }
        let outputs = self.outputs(layer).await;
        if let Err(e) = self.select_workspace(layer, DEFAULT_WORKSPACE, false).await {
            warn!("Failed to leave workspace {} in layer {}: {}", workspace, layer, e);
        }
        outputs.map(Some)
    }

    async fn query_infra(
        &self,
        identity: &ClusterIdentity,
        key: &str,
    ) -> Result<Option<String>, TerraformError> {
        Ok(self
            .query_outputs(Layer::Infra, identity)
            .await?
            .and_then(|outputs| outputs.get(key).map(str::to_string))
            .filter(|value| !value.is_empty()))
    }
}

#[async_trait::async_trait]
impl ProvisionerTrait for TerraformClient {
    async fn acquire_workspace(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<String, TerraformError> {
        let workspace = identity.workspace_name();
        let mut scope = self.lock();
        scope.workspace = Some(workspace.clone());
        scope.entered.clear();
        debug!("Acquired workspace {}", workspace);
        Ok(workspace)
    }

    async fn release_workspace(&self) -> Result<(), TerraformError> {
        let (workspace, entered) = {
            let mut scope = self.lock();
            (scope.workspace.take(), std::mem::take(&mut scope.entered))
        };
        let Some(workspace) = workspace else {
            return Ok(());
        };

        let mut first_error = None;
        for layer in entered {
            if let Err(e) = self.select_workspace(layer, DEFAULT_WORKSPACE, false).await {
                warn!("Failed to release workspace {} in layer {}: {}", workspace, layer, e);
                first_error.get_or_insert(e);
            }
        }
        debug!("Released workspace {}", workspace);
        first_error.map_or(Ok(()), Err)
    }

    async fn ensure_resource_group(
        &self,
        inputs: &ResourceGroupInputs,
    ) -> Result<bool, TerraformError> {
        // The local state of an existing group may be gone (destroy clears it)
        if self.azure.resource_group_exists(&inputs.resource_group).await? {
            info!("Using existing resource group {}", inputs.resource_group);
            return Ok(false);
        }
        let layer = Layer::ResourceGroup;

        let module = self.module_dir(layer);
        if !module.is_dir() {
            return Err(TerraformError::MissingModule {
                layer: layer.to_string(),
                path: module.display().to_string(),
            });
        }
        self.prepare_data_dir(layer, false)?;
        self.init(layer, None, &inputs.resource_group).await?;
        self.apply(layer, &inputs.to_vars()).await?;
        Ok(true)
    }

    async fn ensure_backend_storage(&self, region: &str) -> Result<BackendStorage, TerraformError> {
        Ok(self.azure.ensure_state_backend(region).await?)
    }

    async fn ensure_infra(
        &self,
        inputs: &InfraInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError> {
        self.run_layer(Layer::Infra, &inputs.to_vars(), &inputs.backend, cleanup_state)
            .await
    }

    async fn ensure_k8s_cluster(
        &self,
        inputs: &ClusterInputs,
        cleanup_state: bool,
    ) -> Result<LayerOutput, TerraformError> {
        self.run_layer(
            Layer::KubernetesCluster,
            &inputs.to_vars(),
            &inputs.backend,
            cleanup_state,
        )
        .await
    }

    async fn ensure_services(
        &self,
        inputs: &ServicesInputs,
        cleanup_state: bool,
    ) -> Result<(), TerraformError> {
        self.run_layer(Layer::Services, &inputs.to_vars(), &inputs.backend, cleanup_state)
            .await?;
        Ok(())
    }

    async fn get_current_core_count(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<(u64, u64), TerraformError> {
        let Some(outputs) = self.query_outputs(Layer::Infra, identity).await? else {
            return Ok((0, 0));
        };
        let cores = |key: &str| {
            outputs
                .get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or_default()
        };
        Ok((
            cores(keys::WORKER_NODE_POOL_CORES),
            cores(keys::DEFAULT_NODE_POOL_CORES),
        ))
    }

    async fn get_storage_account_name(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        self.query_infra(identity, keys::STORAGE_ACCOUNT_NAME).await
    }

    async fn get_kubernetes_config_context(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        self.query_infra(identity, keys::KUBERNETES_CONFIG_CONTEXT).await
    }

    async fn get_url_from_terraform_output(
        &self,
        identity: &ClusterIdentity,
    ) -> Result<Option<String>, TerraformError> {
        Ok(self
            .query_infra(identity, keys::PUBLIC_IP_FQDN)
            .await?
            .map(|fqdn| format!("https://{fqdn}")))
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
