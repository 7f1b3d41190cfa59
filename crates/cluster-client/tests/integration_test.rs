//! Integration tests for the Kubernetes cluster client
//!
//! These tests require a running cluster. Set AKS_REMOTE_CONFIG_DIR to a
//! config directory holding its kubeconfig and AKS_REMOTE_CONTEXT to the
//! context name.

use cluster_client::{ClusterClientTrait, KubeClusterClient};
use host_env::HostEnvironment;

fn client() -> (KubeClusterClient, String) {
    let dir = std::env::var("AKS_REMOTE_CONFIG_DIR")
        .expect("AKS_REMOTE_CONFIG_DIR environment variable must be set");
    let context = std::env::var("AKS_REMOTE_CONTEXT")
        .expect("AKS_REMOTE_CONTEXT environment variable must be set");
    let host = HostEnvironment::new(dir, None);
    (KubeClusterClient::new(&host), context)
}

#[tokio::test]
#[ignore] // Requires a running cluster
async fn test_secret_lifecycle() {
    let (client, context) = client();

    client
        .add_secret(&context, "aks-remote-it", "first")
        .await
        .expect("Failed to add secret");
    // Applying again replaces the value
    client
        .add_secret(&context, "aks-remote-it", "second")
        .await
        .expect("Failed to replace secret");
    client
        .delete_secret(&context, "aks-remote-it")
        .await
        .expect("Failed to delete secret");

    let missing = client.delete_secret(&context, "aks-remote-it").await;
    assert!(missing.is_err(), "Deleting a missing secret should fail");
}

#[tokio::test]
#[ignore]
async fn test_ingress_url() {
    let (client, context) = client();
    let url = client
        .url_from_ingress(&context, "")
        .await
        .expect("Failed to list ingresses");
    println!("Ingress URL: {url:?}");
}
