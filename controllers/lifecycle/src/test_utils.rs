//! Test utilities for unit testing workflows
//!
//! Builds a [`LifecycleController`] over in-memory boundaries and a
//! throwaway config directory. The fixture keeps clones of every mock so
//! tests can inspect calls after the workflow ran.

use crate::cli::ActionArgs;
use crate::controller::LifecycleController;
use crate::prompt::ScriptedConfirm;
use crate::workflow::SetupRequest;
use azure_client::{MockAzureClient, ResourceSummary, resource};
use cluster_client::MockClusterClient;
use cluster_model::constants::{
    DEFAULT_IMAGE_PREFIX, DEFAULT_IMAGE_TAG, DEFAULT_REGISTRY_PATH, DEFAULT_SERVICE_LOG_LEVEL,
};
use cluster_model::{ClusterIdentity, CredentialBundle};
use host_env::HostEnvironment;
use std::sync::Arc;
use terraform_client::MockProvisioner;

pub const CLUSTER_NAME: &str = "vibes";
pub const RESOURCE_GROUP: &str = "vibes-rg";
pub const REGION: &str = "eastus";
/// Context published by the mock provisioner's infra outputs
pub const CONTEXT: &str = "vibes-ctx";
pub const FQDN: &str = "vibes.eastus.cloudapp.azure.com";

pub const REPLACE_QUESTION: &str = "Do you want to delete your current cluster?";
pub const KEEP_QUESTION: &str =
    "Do you wish the keep the cluster (Answering 'y' will leave the cluster as is)?";

pub fn identity() -> ClusterIdentity {
    ClusterIdentity::new(CLUSTER_NAME, RESOURCE_GROUP, REGION)
}

/// Resources of a fully provisioned cluster
pub fn cluster_resources() -> Vec<ResourceSummary> {
    vec![
        resource(
            RESOURCE_GROUP,
            CLUSTER_NAME,
            "Microsoft.ContainerService/managedClusters",
        ),
        resource(RESOURCE_GROUP, "vibes-ip", "Microsoft.Network/publicIPAddresses"),
        resource(RESOURCE_GROUP, "vibesstorage", "Microsoft.Storage/storageAccounts"),
    ]
}

/// Subscription already holding the cluster
pub fn existing_cluster() -> MockAzureClient {
    MockAzureClient::new().with_cluster(&identity(), cluster_resources())
}

pub fn setup_request() -> SetupRequest {
    SetupRequest {
        certificate_email: "ops@example.com".to_string(),
        registry: CredentialBundle::new(DEFAULT_REGISTRY_PATH, None, None),
        image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
        image_tag: DEFAULT_IMAGE_TAG.to_string(),
        log_level: DEFAULT_SERVICE_LOG_LEVEL.to_string(),
        max_worker_nodes: 3,
        worker_replicas: 1,
    }
}

pub struct Fixture {
    pub config: tempfile::TempDir,
    pub host: HostEnvironment,
    pub azure: MockAzureClient,
    pub provisioner: MockProvisioner,
    pub cluster: MockClusterClient,
    pub confirm: Arc<ScriptedConfirm>,
}

impl Fixture {
    /// Empty subscription, healthy provisioner, cluster without ingress, no answers
    pub fn new() -> Self {
        let config = tempfile::tempdir().unwrap();
        let host = HostEnvironment::new(config.path(), None).with_path_var(None);
        std::fs::create_dir_all(host.terraform_state_dir()).unwrap();
        Self {
            config,
            host,
            azure: MockAzureClient::new(),
            provisioner: MockProvisioner::new(),
            cluster: MockClusterClient::new(),
            confirm: Arc::new(ScriptedConfirm::new(&[])),
        }
    }

    pub fn with_azure(mut self, azure: MockAzureClient) -> Self {
        self.azure = azure;
        self
    }

    pub fn with_provisioner(mut self, provisioner: MockProvisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    pub fn with_cluster_client(mut self, cluster: MockClusterClient) -> Self {
        self.cluster = cluster;
        self
    }

    /// Answer the operator prompts with `answers`, in order
    pub fn answering(mut self, answers: &[bool]) -> Self {
        self.confirm = Arc::new(ScriptedConfirm::new(answers));
        self
    }

    pub fn controller(&self) -> LifecycleController {
        self.controller_for(identity())
    }

    pub fn controller_for(&self, identity: ClusterIdentity) -> LifecycleController {
        LifecycleController::new(
            identity,
            self.host.clone(),
            Arc::new(self.azure.clone()),
            Arc::new(self.provisioner.clone()),
            Arc::new(self.cluster.clone()),
            self.confirm.clone(),
        )
    }

    pub fn action_args(&self) -> ActionArgs {
        ActionArgs {
            setup: setup_request(),
            model_path: None,
            secret_name: None,
            secret_value: None,
            keep_resource_group: false,
        }
    }

    /// Raw content of the persisted endpoint file
    pub fn persisted_url(&self) -> Option<String> {
        std::fs::read_to_string(self.host.endpoint().path()).ok()
    }

    /// Seed local state that destroy must clear
    pub fn seed_local_state(&self) {
        std::fs::write(self.host.kubeconfig_path(), "apiVersion: v1").unwrap();
        let layer_dir = self.host.terraform_state_dir().join("infra");
        std::fs::create_dir_all(&layer_dir).unwrap();
        std::fs::write(layer_dir.join("terraform.tfstate"), "{}").unwrap();
    }

    /// Whether any local state survived
    pub fn has_local_state(&self) -> bool {
        self.host.kubeconfig_path().exists()
            || std::fs::read_dir(self.host.terraform_state_dir())
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false)
    }
}
