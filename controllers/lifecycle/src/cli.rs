//! Command line surface.
//!
//! The action is taken as a free string and parsed here, so unsupported
//! actions produce guidance instead of a clap usage error.

use crate::workflow::SetupRequest;
use clap::Parser;
use cluster_model::constants::{
    DEFAULT_IMAGE_PREFIX, DEFAULT_IMAGE_TAG, DEFAULT_REGISTRY_PATH, DEFAULT_SERVICE_LOG_LEVEL,
    MAX_WORKER_NODES, START_STOP_DOCS_URL,
};
use cluster_model::{ClusterIdentity, CredentialBundle};
use std::fmt;
use std::path::PathBuf;

/// Create, update, inspect and tear down a remote AKS cluster
#[derive(Debug, Parser)]
#[command(name = "aks-remote", version, about)]
pub struct Cli {
    /// Action: setup, update, destroy, status, add-onnx, add-secret, delete-secret
    pub action: String,

    /// Name of the AKS cluster
    #[arg(long, default_value = "aks-remote")]
    pub cluster_name: String,

    /// Resource group holding every cluster resource
    #[arg(long, default_value = "")]
    pub resource_group: String,

    /// Azure region (e.g. "eastus" or "East US")
    #[arg(long, default_value = "")]
    pub region: String,

    /// Contact e-mail for the TLS certificate issuer
    #[arg(long, default_value = "")]
    pub cert_email: String,

    /// Registry the service images are pulled from
    #[arg(long, default_value = DEFAULT_REGISTRY_PATH)]
    pub registry: String,

    /// Registry user name (inferred for Azure Container Registry when omitted)
    #[arg(long)]
    pub registry_username: Option<String>,

    /// Registry password (inferred for Azure Container Registry when omitted)
    #[arg(long, env = "AKS_REMOTE_REGISTRY_PASSWORD", hide_env_values = true)]
    pub registry_password: Option<String>,

    /// Image name prefix inside the registry
    #[arg(long, default_value = DEFAULT_IMAGE_PREFIX)]
    pub image_prefix: String,

    /// Image tag
    #[arg(long, default_value = DEFAULT_IMAGE_TAG)]
    pub image_tag: String,

    /// Log level of the deployed services
    #[arg(long, default_value = DEFAULT_SERVICE_LOG_LEVEL)]
    pub log_level: String,

    /// Upper bound of the worker node pool
    #[arg(long, default_value_t = MAX_WORKER_NODES)]
    pub max_worker_nodes: u32,

    /// Number of worker replicas; setup refuses to run without at least one
    #[arg(long, default_value_t = 0)]
    pub worker_replicas: u32,

    /// ONNX model to upload (add-onnx)
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Secret name (add-secret, delete-secret)
    #[arg(long)]
    pub secret_name: Option<String>,

    /// Secret value (add-secret)
    #[arg(long)]
    pub secret_value: Option<String>,

    /// Keep the resource group when destroying
    #[arg(long)]
    pub keep_resource_group: bool,

    /// Configuration directory
    #[arg(long, env = "AKS_REMOTE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Root of the Terraform modules
    #[arg(long, env = "AKS_REMOTE_TERRAFORM_MODULES")]
    pub terraform_modules: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Identity of the cluster this invocation works on
    pub fn identity(&self) -> ClusterIdentity {
        ClusterIdentity::new(&self.cluster_name, &self.resource_group, &self.region)
    }

    /// Arguments consumed by the individual workflows
    pub fn action_args(&self) -> ActionArgs {
        ActionArgs {
            setup: SetupRequest {
                certificate_email: self.cert_email.clone(),
                registry: CredentialBundle::new(
                    self.registry.clone(),
                    self.registry_username.clone(),
                    self.registry_password.clone(),
                ),
                image_prefix: self.image_prefix.clone(),
                image_tag: self.image_tag.clone(),
                log_level: self.log_level.clone(),
                max_worker_nodes: self.max_worker_nodes,
                worker_replicas: self.worker_replicas,
            },
            model_path: self.model_path.clone(),
            secret_name: self.secret_name.clone(),
            secret_value: self.secret_value.clone(),
            keep_resource_group: self.keep_resource_group,
        }
    }
}

/// Per-action arguments
#[derive(Debug, Clone)]
pub struct ActionArgs {
    /// Setup and update parameters
    pub setup: SetupRequest,
    /// Model to upload
    pub model_path: Option<PathBuf>,
    /// Secret name
    pub secret_name: Option<String>,
    /// Secret value
    pub secret_value: Option<String>,
    /// Keep the resource group on destroy
    pub keep_resource_group: bool,
}

/// Supported actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a fresh cluster
    Setup,
    /// Update an existing cluster
    Update,
    /// Tear the cluster down
    Destroy,
    /// Discover and persist the service URL
    Status,
    /// Upload an ONNX model
    AddOnnx,
    /// Create or replace a secret
    AddSecret,
    /// Delete a secret
    DeleteSecret,
}

/// Why an action string was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedAction {
    /// Power management belongs to the cloud portal or CLI
    PowerManagement(String),
    /// Not an action at all
    Unknown(String),
}

impl fmt::Display for UnsupportedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedAction::PowerManagement(action) => write!(
                f,
                "Action '{action}' is not supported by aks-remote. \
                 To stop, start or restart your AKS cluster, see {START_STOP_DOCS_URL}"
            ),
            UnsupportedAction::Unknown(action) => write!(
                f,
                "Unknown action '{action}'. Supported actions: setup, update, destroy, \
                 status, add-onnx, add-secret, delete-secret"
            ),
        }
    }
}

impl Action {
    /// Parse an action name or alias.
    pub fn parse(action: &str) -> Result<Self, UnsupportedAction> {
        match action.trim().to_ascii_lowercase().as_str() {
            "setup" => Ok(Action::Setup),
            "update" | "up" | "upgrade" => Ok(Action::Update),
            "destroy" | "rm" | "del" | "remove" => Ok(Action::Destroy),
            "status" | "show-url" | "url" => Ok(Action::Status),
            "add-onnx" | "add_onnx" => Ok(Action::AddOnnx),
            "add-secret" => Ok(Action::AddSecret),
            "delete-secret" => Ok(Action::DeleteSecret),
            "stop" | "start" | "restart" => {
                Err(UnsupportedAction::PowerManagement(action.to_string()))
            }
            _ => Err(UnsupportedAction::Unknown(action.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Setup => "setup",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Status => "status",
            Action::AddOnnx => "add-onnx",
            Action::AddSecret => "add-secret",
            Action::DeleteSecret => "delete-secret",
        };
        f.write_str(name)
    }
}
