//! Integration tests for the Terraform provisioner
//!
//! These tests require `terraform` on PATH and, for the remote layers, the
//! aks-remote modules. Set AKS_REMOTE_TERRAFORM_MODULES to the modules root.

use azure_client::AzureCliClient;
use cluster_model::ClusterIdentity;
use host_env::{HostEnvironment, ToolInvocation};
use std::path::PathBuf;
use std::sync::Arc;
use terraform_client::{ProvisionerTrait, TerraformClient};

fn host(config: &tempfile::TempDir) -> HostEnvironment {
    let modules = std::env::var_os("AKS_REMOTE_TERRAFORM_MODULES").map(PathBuf::from);
    HostEnvironment::discover(Some(config.path().to_path_buf()), modules)
        .expect("Failed to prepare config directory")
}

#[tokio::test]
#[ignore] // Requires terraform on PATH
async fn test_terraform_is_runnable() {
    let config = tempfile::tempdir().expect("Failed to create temp dir");
    let version = host(&config)
        .runner()
        .run(&ToolInvocation::new("terraform").arg("version"))
        .await
        .expect("terraform version failed");
    assert!(version.starts_with("Terraform v"));
}

#[tokio::test]
#[ignore]
async fn test_queries_without_state_are_empty() {
    let config = tempfile::tempdir().expect("Failed to create temp dir");
    let host = host(&config);
    let azure = Arc::new(AzureCliClient::new(host.runner()));
    let client = TerraformClient::new(&host, azure);
    let identity = ClusterIdentity::new("vibes", "vibes-rg", "eastus");

    let url = client
        .get_url_from_terraform_output(&identity)
        .await
        .expect("Query failed");
    assert_eq!(url, None);

    let cores = client
        .get_current_core_count(&identity)
        .await
        .expect("Query failed");
    assert_eq!(cores, (0, 0));
}
