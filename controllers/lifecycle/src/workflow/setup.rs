//! Setup and update
//!
//! Validation runs first and never touches remote state: replica count,
//! session, quota, name length, the existing-cluster check and the account
//! lookup. Provisioning then ensures every layer in order. A provisioning
//! failure leads to the rollback decision: an update is always left as is,
//! a fresh create asks the operator whether to keep what was built, and a
//! rollback only deletes the resource group when this run created it.

use super::transition;
use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use cluster_model::{
    BackendStorage, CredentialBundle, Layer, LayerOutput, LifecyclePhase, LifecycleState,
    QuotaRequest, validate_name,
};
use terraform_client::{
    ClusterInputs, InfraInputs, ResourceGroupInputs, ServiceSettings, ServicesInputs,
};
use tracing::{debug, error, info, warn};

const REPLACE_QUESTION: &str = "Do you want to delete your current cluster?";
const KEEP_QUESTION: &str =
    "Do you wish the keep the cluster (Answering 'y' will leave the cluster as is)?";

/// Parameters of a setup or update run.
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub certificate_email: String,
    pub registry: CredentialBundle,
    pub image_prefix: String,
    pub image_tag: String,
    /// Forwarded to the services, not the CLI's own verbosity
    pub log_level: String,
    pub max_worker_nodes: u32,
    pub worker_replicas: u32,
}

/// What validation learned about the account.
#[derive(Debug, Clone)]
struct Validated {
    tenant_id: String,
    subscription_id: String,
    current_user_name: String,
}

impl LifecycleController {
    /// Create (`is_update == false`) or update the cluster, then report its URL.
    pub async fn setup(&self, request: &SetupRequest, is_update: bool) -> bool {
        self.setup_tracked(request, is_update).await.0
    }

    /// [`setup`](Self::setup) plus the phases visited.
    pub(crate) async fn setup_tracked(
        &self,
        request: &SetupRequest,
        is_update: bool,
    ) -> (bool, LifecycleState) {
        let mut state = LifecycleState::new(is_update);
        transition(&mut state, LifecyclePhase::Validating);

        let validated = match self.validate(request, is_update).await {
            Ok(validated) => validated,
            Err(e) => {
                error!("{}", e);
                transition(&mut state, LifecyclePhase::Rejected);
                return (false, state);
            }
        };

        info!(
            "Will {} cluster {} in resource group {}...",
            if is_update { "update" } else { "create" },
            self.identity.cluster_name(),
            self.identity.resource_group()
        );
        match self.provision(request, &validated, &mut state).await {
            Ok(()) => {
                transition(&mut state, LifecyclePhase::Ready);
                (self.status().await, state)
            }
            Err(LifecycleError::NoBackend) => {
                error!("{}", LifecycleError::NoBackend);
                transition(&mut state, LifecyclePhase::Abandoned);
                (false, state)
            }
            Err(e) => {
                error!("{}", e);
                self.decide_rollback(&mut state).await;
                (false, state)
            }
        }
    }

    async fn validate(
        &self,
        request: &SetupRequest,
        is_update: bool,
    ) -> Result<Validated, LifecycleError> {
        if request.worker_replicas == 0 {
            return Err(LifecycleError::Precondition(
                "No worker replicas specified. You can change this by re-running with \
                 `--worker-replicas <number>`"
                    .to_string(),
            ));
        }
        let region = self.identity.region();
        if region.is_empty() {
            return Err(LifecycleError::Precondition(
                "A region is required to set up or update a cluster (--region)".to_string(),
            ));
        }
        if self.identity.resource_group().is_empty() {
            return Err(LifecycleError::Precondition(
                "A resource group is required to set up or update a cluster (--resource-group)"
                    .to_string(),
            ));
        }

        self.azure
            .ensure_session()
            .await
            .map_err(LifecycleError::auth)?;
        self.azure
            .ensure_resource_providers(region)
            .await
            .map_err(LifecycleError::auth)?;

        let quota = if is_update {
            let (worker, default) = self
                .provisioner
                .get_current_core_count(&self.identity)
                .await
                .map_err(|e| LifecycleError::Quota(e.to_string()))?;
            QuotaRequest {
                max_worker_nodes: request.max_worker_nodes,
                existing_worker_cores: worker,
                existing_default_cores: default,
            }
        } else {
            QuotaRequest::fresh(request.max_worker_nodes)
        };
        debug!("Requesting {} additional cores", quota.required_cores());
        self.azure
            .verify_cores(region, quota)
            .await
            .map_err(|e| match LifecycleError::cloud(e) {
                quota @ LifecycleError::Quota(_) => quota,
                other => LifecycleError::Quota(other.to_string()),
            })?;

        if !validate_name(self.identity.cluster_name()) {
            return Err(LifecycleError::Precondition(format!(
                "Invalid cluster name '{}'",
                self.identity.cluster_name()
            )));
        }

        info!("Getting current user name...");
        let current_user_name = self.azure.current_user_name().await?;
        debug!("Current user name is: {}", current_user_name);

        info!("Verifying cluster already exists...");
        if !is_update && self.azure.cluster_exists(&self.identity).await? {
            self.replace_existing_cluster().await?;
        }

        let account = self.azure.account().await.map_err(|e| {
            LifecycleError::Auth(format!(
                "{e}. Please make sure you are logged in with 'az login' \
                 and have selected the right subscription"
            ))
        })?;

        Ok(Validated {
            tenant_id: account.tenant_id,
            subscription_id: account.id,
            current_user_name,
        })
    }

    /// Destroy the existing cluster on confirmation, otherwise cancel the run.
    async fn replace_existing_cluster(&self) -> Result<(), LifecycleError> {
        warn!("Seems like you might have a cluster already created.");
        if !self.confirm.confirm(REPLACE_QUESTION) {
            info!("Canceling installation...");
            return Err(LifecycleError::Cancelled);
        }
        // The resource group may hold more than this cluster
        if !self.destroy(false).await {
            return Err(LifecycleError::Provisioning {
                kind: "AzureError",
                message: "failed to destroy the existing cluster".to_string(),
            });
        }
        Ok(())
    }

    async fn provision(
        &self,
        request: &SetupRequest,
        validated: &Validated,
        state: &mut LifecycleState,
    ) -> Result<(), LifecycleError> {
        let region = self.identity.region();

        if !state.is_update() {
            state.advance(LifecyclePhase::Provisioning(Layer::ResourceGroup))?;
            let created = self
                .provisioner
                .ensure_resource_group(&ResourceGroupInputs {
                    tenant_id: validated.tenant_id.clone(),
                    subscription_id: validated.subscription_id.clone(),
                    region: region.to_string(),
                    cluster_name: self.identity.cluster_name().to_string(),
                    resource_group: self.identity.resource_group().to_string(),
                })
                .await?;
            state.mark_resource_group_created(created);
        }

        state.advance(LifecyclePhase::Provisioning(Layer::StorageBackend))?;
        let backend = self.provisioner.ensure_backend_storage(region).await?;
        if !backend.is_complete() {
            return Err(LifecycleError::NoBackend);
        }

        let registry = self.resolve_registry(&request.registry, state.is_update()).await?;

        let workspace = self.provisioner.acquire_workspace(&self.identity).await?;
        debug!("Provisioning inside workspace {}", workspace);
        let result = self
            .provision_layers(request, validated, registry, backend, state)
            .await;
        if let Err(e) = self.provisioner.release_workspace().await {
            warn!("Failed to release workspace {}: {}", workspace, e);
        }
        result
    }

    /// Fill in managed registry credentials on a fresh create.
    async fn resolve_registry(
        &self,
        registry: &CredentialBundle,
        is_update: bool,
    ) -> Result<CredentialBundle, LifecycleError> {
        if !registry.needs_inference(is_update) {
            return Ok(registry.clone());
        }
        match self.azure.registry_credentials(registry).await {
            Ok((username, password)) => Ok(registry.clone().with_credentials(username, password)),
            Err(e) => {
                error!(
                    "Couldn't infer registry credentials for {}. Please provide them explicitly.",
                    registry.registry_path
                );
                Err(e.into())
            }
        }
    }

    async fn provision_layers(
        &self,
        request: &SetupRequest,
        validated: &Validated,
        registry: CredentialBundle,
        backend: BackendStorage,
        state: &mut LifecycleState,
    ) -> Result<(), LifecycleError> {
        let cleanup_state = !state.is_update();

        state.advance(LifecyclePhase::Provisioning(Layer::Infra))?;
        let infra: LayerOutput = self
            .provisioner
            .ensure_infra(
                &InfraInputs {
                    tenant_id: validated.tenant_id.clone(),
                    subscription_id: validated.subscription_id.clone(),
                    region: self.identity.region().to_string(),
                    cluster_name: self.identity.cluster_name().to_string(),
                    resource_group: self.identity.resource_group().to_string(),
                    max_worker_nodes: request.max_worker_nodes,
                    backend: backend.clone(),
                },
                cleanup_state,
            )
            .await?;

        state.advance(LifecyclePhase::Provisioning(Layer::KubernetesCluster))?;
        let registry_path = registry.registry_path.clone();
        let cluster_inputs = ClusterInputs::from_infra(
            &infra,
            validated.tenant_id.clone(),
            registry,
            self.identity.resource_group(),
            validated.current_user_name.clone(),
            request.certificate_email.clone(),
            backend.clone(),
        )?;
        let cluster = self
            .provisioner
            .ensure_k8s_cluster(&cluster_inputs, cleanup_state)
            .await?;

        state.advance(LifecyclePhase::Provisioning(Layer::Services))?;
        let services = ServicesInputs::from_outputs(
            &infra,
            &cluster,
            self.identity.cluster_name(),
            registry_path,
            self.host.kubeconfig_path(),
            ServiceSettings {
                image_prefix: request.image_prefix.clone(),
                image_tag: request.image_tag.clone(),
                worker_replicas: request.worker_replicas,
                log_level: request.log_level.clone(),
            },
            backend,
        )?;
        self.provisioner
            .ensure_services(&services, cleanup_state)
            .await?;
        Ok(())
    }

    /// Keep or roll back after a provisioning failure.
    async fn decide_rollback(&self, state: &mut LifecycleState) {
        if state.is_update() {
            info!("Failed to update cluster.");
            info!(
                "Skipping cluster deletion since this is an update, \
                 please try again later if the cluster is misbehaving."
            );
            transition(state, LifecyclePhase::Abandoned);
            return;
        }

        info!("Failed to create cluster. Cleaning up...");
        if self.confirm.confirm(KEEP_QUESTION) {
            transition(state, LifecyclePhase::Abandoned);
            info!(
                "User opted to keep the cluster. Leaving it as is. \
                 The cluster can be destroyed later by running the `destroy` subcommand."
            );
            return;
        }

        transition(state, LifecyclePhase::RollingBack);
        let destroy_rg = state.created_resource_group();
        if !self.destroy(destroy_rg).await {
            warn!(
                "Rollback of cluster {} did not complete; run `destroy` to finish it",
                self.identity
            );
        }
    }
}
