//! Unit tests for the setup and update workflow

use crate::test_utils::*;
use azure_client::MockAzureClient;
use cluster_client::MockClusterClient;
use cluster_model::{
    BackendStorage, ClusterIdentity, CoreUsage, CredentialBundle, Layer, LifecyclePhase,
};
use terraform_client::MockProvisioner;

#[tokio::test]
async fn zero_replicas_is_rejected_before_any_call() {
    let fixture = Fixture::new();
    let mut request = setup_request();
    request.worker_replicas = 0;

    let (ok, state) = fixture.controller().setup_tracked(&request, false).await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Rejected);
    assert!(fixture.provisioner.calls().is_empty());
    assert!(fixture.azure.calls().is_empty());
}

#[tokio::test]
async fn fresh_create_provisions_layers_in_order() {
    let fixture = Fixture::new()
        .with_cluster_client(MockClusterClient::new().with_ingress_host(CONTEXT, FQDN));

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(ok);
    assert_eq!(
        fixture.provisioner.calls()[..7],
        [
            "ensure_resource_group",
            "ensure_backend_storage",
            "acquire_workspace",
            "ensure_infra",
            "ensure_k8s_cluster",
            "ensure_services",
            "release_workspace",
        ]
    );
    assert_eq!(
        state.history(),
        [
            LifecyclePhase::New,
            LifecyclePhase::Validating,
            LifecyclePhase::Provisioning(Layer::ResourceGroup),
            LifecyclePhase::Provisioning(Layer::StorageBackend),
            LifecyclePhase::Provisioning(Layer::Infra),
            LifecyclePhase::Provisioning(Layer::KubernetesCluster),
            LifecyclePhase::Provisioning(Layer::Services),
            LifecyclePhase::Ready,
        ]
    );
    assert!(state.created_resource_group());
    assert!(!fixture.provisioner.holds_workspace());

    // Success ends with status
    assert_eq!(
        fixture.persisted_url().as_deref(),
        Some("https://vibes.eastus.cloudapp.azure.com")
    );
}

#[tokio::test]
async fn fresh_create_cleans_layer_state() {
    let fixture = Fixture::new();
    fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert_eq!(
        fixture.provisioner.cleanup_flags(),
        vec![
            ("infra".to_string(), true),
            ("kubernetes".to_string(), true),
            ("services".to_string(), true),
        ]
    );
    let services = fixture.provisioner.services_inputs();
    assert_eq!(services[0].shared_resource_pv_claim_name, "shared-claim");
    assert_eq!(services[0].kubeconfig_path, fixture.host.kubeconfig_path());
    assert_eq!(services[0].worker_replicas, 1);
}

#[tokio::test]
async fn update_keeps_state_and_skips_resource_group() {
    let fixture = Fixture::new()
        .with_azure(existing_cluster())
        .with_provisioner(MockProvisioner::new().with_core_count(24, 4));

    let (_, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), true)
        .await;

    assert_eq!(fixture.provisioner.call_count("ensure_resource_group"), 0);
    assert_eq!(fixture.provisioner.call_count("get_current_core_count"), 1);
    assert!(
        fixture
            .provisioner
            .cleanup_flags()
            .iter()
            .all(|(_, cleanup)| !cleanup)
    );
    assert_eq!(state.phase(), LifecyclePhase::Ready);
    // An update never asks to replace the cluster
    assert!(fixture.confirm.asked().is_empty());
}

#[tokio::test]
async fn update_credits_existing_cores_against_quota() {
    let tight = vec![CoreUsage {
        name: "cores".to_string(),
        current: 28,
        limit: 30,
    }];

    let fresh = Fixture::new().with_azure(MockAzureClient::new().with_usage(tight.clone()));
    let (ok, _) = fresh.controller().setup_tracked(&setup_request(), false).await;
    assert!(!ok);
    assert!(fresh.provisioner.calls().is_empty());

    let update = Fixture::new()
        .with_azure(existing_cluster().with_usage(tight))
        .with_provisioner(MockProvisioner::new().with_core_count(24, 4));
    let (ok, _) = update.controller().setup_tracked(&setup_request(), true).await;
    assert_eq!(update.provisioner.call_count("ensure_services"), 1);
    // No ingress in the mock cluster, status falls back to the outputs
    assert!(ok);
}

#[tokio::test]
async fn logged_out_session_is_terminal() {
    let fixture = Fixture::new().with_azure(MockAzureClient::new().logged_out());

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Rejected);
    assert_eq!(fixture.azure.calls(), vec!["ensure_session"]);
    assert!(fixture.provisioner.calls().is_empty());
}

#[tokio::test]
async fn empty_resource_group_is_rejected_before_any_call() {
    let fixture = Fixture::new();
    let controller = fixture.controller_for(ClusterIdentity::new(CLUSTER_NAME, "", REGION));

    let (ok, state) = controller.setup_tracked(&setup_request(), false).await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Rejected);
    assert!(fixture.azure.calls().is_empty());
    assert!(fixture.provisioner.calls().is_empty());
}

#[tokio::test]
async fn long_name_is_rejected_before_provisioning() {
    let fixture = Fixture::new();
    let controller =
        fixture.controller_for(ClusterIdentity::new("x".repeat(53), RESOURCE_GROUP, REGION));

    assert!(!controller.setup(&setup_request(), false).await);
    assert!(fixture.provisioner.calls().is_empty());
    assert_eq!(fixture.azure.call_count("cluster_exists"), 0);
}

#[tokio::test]
async fn missing_account_surfaces_login_guidance() {
    let fixture = Fixture::new().with_azure(MockAzureClient::new().without_account());

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Rejected);
    assert!(fixture.provisioner.calls().is_empty());
}

#[tokio::test]
async fn declined_replacement_cancels_without_touching_anything() {
    let fixture = Fixture::new()
        .with_azure(existing_cluster())
        .answering(&[false]);

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Rejected);
    assert_eq!(fixture.confirm.asked(), vec![REPLACE_QUESTION]);
    assert_eq!(fixture.azure.call_count("delete_resources"), 0);
    assert!(fixture.provisioner.calls().is_empty());
}

#[tokio::test]
async fn confirmed_replacement_destroys_but_keeps_group() {
    let fixture = Fixture::new()
        .with_azure(existing_cluster())
        .answering(&[true]);

    let (ok, _) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(ok);
    assert_eq!(fixture.azure.call_count("delete_resources"), 1);
    assert_eq!(fixture.azure.call_count("delete_resource_group"), 0);
    assert_eq!(fixture.provisioner.call_count("ensure_services"), 1);
}

#[tokio::test]
async fn declined_keep_rolls_back_created_resource_group() {
    let fixture = Fixture::new()
        .with_azure(MockAzureClient::new().with_resource_group(RESOURCE_GROUP))
        .with_provisioner(MockProvisioner::new().failing("ensure_k8s_cluster"))
        .answering(&[false]);

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert!(state.created_resource_group());
    assert_eq!(state.phase(), LifecyclePhase::RollingBack);
    assert_eq!(fixture.confirm.asked(), vec![KEEP_QUESTION]);
    assert_eq!(fixture.azure.call_count("delete_resource_group"), 1);
    assert!(!fixture.azure.has_resource_group(RESOURCE_GROUP));
    assert!(!fixture.provisioner.holds_workspace());
}

#[tokio::test]
async fn rollback_spares_preexisting_resource_group() {
    let fixture = Fixture::new()
        .with_azure(MockAzureClient::new().with_resource_group(RESOURCE_GROUP))
        .with_provisioner(
            MockProvisioner::new()
                .with_existing_resource_group()
                .failing("ensure_infra"),
        )
        .answering(&[false]);

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert!(!state.created_resource_group());
    assert_eq!(fixture.azure.call_count("resource_group_exists"), 1);
    assert_eq!(fixture.azure.call_count("delete_resource_group"), 0);
    assert!(fixture.azure.has_resource_group(RESOURCE_GROUP));
}

#[tokio::test]
async fn kept_cluster_is_abandoned_as_is() {
    let fixture = Fixture::new()
        .with_azure(MockAzureClient::new().with_resource_group(RESOURCE_GROUP))
        .with_provisioner(MockProvisioner::new().failing("ensure_services"))
        .answering(&[true]);

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Abandoned);
    assert_eq!(fixture.azure.call_count("resource_group_exists"), 0);
    assert_eq!(fixture.azure.call_count("delete_resources"), 0);
    assert!(!fixture.provisioner.holds_workspace());
}

#[tokio::test]
async fn failed_update_never_destroys() {
    // No scripted answers: any prompt would panic
    let fixture = Fixture::new()
        .with_azure(existing_cluster())
        .with_provisioner(MockProvisioner::new().failing("ensure_k8s_cluster"));

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), true)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Abandoned);
    assert!(fixture.confirm.asked().is_empty());
    assert_eq!(fixture.azure.call_count("delete_resources"), 0);
    assert_eq!(fixture.azure.call_count("delete_resource_group"), 0);
    assert!(!fixture.provisioner.holds_workspace());
}

#[tokio::test]
async fn incomplete_backend_refuses_to_create() {
    let fixture = Fixture::new().with_provisioner(MockProvisioner::new().with_backend(
        BackendStorage {
            storage_name: "aksremotestate".to_string(),
            container_name: String::new(),
            access_key: "state-key".to_string(),
        },
    ));

    let (ok, state) = fixture
        .controller()
        .setup_tracked(&setup_request(), false)
        .await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Abandoned);
    assert_eq!(fixture.provisioner.call_count("acquire_workspace"), 0);
    assert!(fixture.confirm.asked().is_empty());
}

#[tokio::test]
async fn managed_registry_credentials_are_inferred() {
    let fixture = Fixture::new()
        .with_azure(MockAzureClient::new().with_registry("myreg", "myreg", "s3cret"))
        .with_cluster_client(MockClusterClient::new().with_ingress_host(CONTEXT, FQDN));
    let mut request = setup_request();
    request.registry = CredentialBundle::new("myreg.azurecr.io", None, None);

    assert!(fixture.controller().setup(&request, false).await);
    assert_eq!(fixture.azure.call_count("registry_credentials"), 1);
    assert_eq!(
        fixture.provisioner.services_inputs()[0].registry_path,
        "myreg.azurecr.io"
    );
}

#[tokio::test]
async fn failed_inference_enters_rollback_decision() {
    let fixture = Fixture::new()
        .with_provisioner(MockProvisioner::new().with_existing_resource_group())
        .answering(&[true]);
    let mut request = setup_request();
    request.registry = CredentialBundle::new("unknown.azurecr.io", None, None);

    let (ok, state) = fixture.controller().setup_tracked(&request, false).await;

    assert!(!ok);
    assert_eq!(state.phase(), LifecyclePhase::Abandoned);
    assert_eq!(fixture.confirm.asked(), vec![KEEP_QUESTION]);
    assert_eq!(fixture.provisioner.call_count("acquire_workspace"), 0);
}
