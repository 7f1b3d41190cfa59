//! Lifecycle controller
//!
//! Holds the cluster identity, the host environment and one handle per
//! boundary (cloud, provisioner, cluster, operator prompt). The workflows in
//! [`crate::workflow`] extend it; [`LifecycleController::dispatch`] routes a
//! parsed action to one of them and turns the outcome into a boolean.

use crate::cli::{Action, ActionArgs};
use crate::error::LifecycleError;
use crate::prompt::Confirm;
use azure_client::AzureClientTrait;
use cluster_client::ClusterClientTrait;
use cluster_model::ClusterIdentity;
use cluster_model::constants::REQUIRED_TOOLS;
use host_env::HostEnvironment;
use std::sync::Arc;
use terraform_client::ProvisionerTrait;
use tracing::{debug, error, warn};

/// Runs lifecycle workflows against one cluster identity.
pub struct LifecycleController {
    pub(crate) identity: ClusterIdentity,
    pub(crate) host: HostEnvironment,
    pub(crate) azure: Arc<dyn AzureClientTrait>,
    pub(crate) provisioner: Arc<dyn ProvisionerTrait>,
    pub(crate) cluster: Arc<dyn ClusterClientTrait>,
    pub(crate) confirm: Arc<dyn Confirm>,
}

impl LifecycleController {
    pub fn new(
        identity: ClusterIdentity,
        host: HostEnvironment,
        azure: Arc<dyn AzureClientTrait>,
        provisioner: Arc<dyn ProvisionerTrait>,
        cluster: Arc<dyn ClusterClientTrait>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            identity,
            host,
            azure,
            provisioner,
            cluster,
            confirm,
        }
    }

    /// Run `action` to completion; `true` on success.
    pub async fn dispatch(&self, action: Action, args: &ActionArgs) -> bool {
        debug!("Dispatching {} for {}", action, self.identity);
        let succeeded = match action {
            Action::Setup => self.setup(&args.setup, false).await,
            Action::Update => self.setup(&args.setup, true).await,
            Action::Destroy => self.destroy(!args.keep_resource_group).await,
            Action::Status => self.status().await,
            Action::AddOnnx => match &args.model_path {
                Some(path) => self.add_onnx(path).await,
                None => missing_argument(action, "--model-path"),
            },
            Action::AddSecret => match (&args.secret_name, &args.secret_value) {
                (Some(name), Some(value)) => self.add_secret(name, value).await,
                (None, _) => missing_argument(action, "--secret-name"),
                (_, None) => missing_argument(action, "--secret-value"),
            },
            Action::DeleteSecret => match &args.secret_name {
                Some(name) => self.delete_secret(name).await,
                None => missing_argument(action, "--secret-name"),
            },
        };

        if action != Action::Destroy {
            if let Some(warning) = self.host.path_warning() {
                warn!("{}", warning);
            }
        }
        succeeded
    }
}

fn missing_argument(action: Action, flag: &str) -> bool {
    error!(
        "{}",
        LifecycleError::Precondition(format!("Action '{action}' requires {flag}"))
    );
    false
}

/// Every external tool must be resolvable before any workflow runs.
pub fn preflight(host: &HostEnvironment) -> Result<(), LifecycleError> {
    host.check_dependencies(&REQUIRED_TOOLS)
        .map_err(|e| LifecycleError::Precondition(e.to_string()))
}
