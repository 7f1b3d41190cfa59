//! Unit tests for teardown

use crate::test_utils::*;
use azure_client::MockAzureClient;
use cluster_model::ClusterIdentity;

#[tokio::test]
async fn destroy_deletes_resources_then_group() {
    let fixture = Fixture::new().with_azure(existing_cluster());
    fixture.seed_local_state();

    assert!(fixture.controller().destroy(true).await);

    assert_eq!(
        fixture.azure.calls(),
        vec![
            "resource_group_exists",
            "list_resources",
            "delete_resources",
            "delete_resource_group",
        ]
    );
    assert!(!fixture.azure.has_resource_group(RESOURCE_GROUP));
    assert!(!fixture.has_local_state());
}

#[tokio::test]
async fn second_destroy_is_a_no_op() {
    let fixture = Fixture::new().with_azure(existing_cluster());
    let controller = fixture.controller();

    assert!(controller.destroy(true).await);
    let after_first = fixture.azure.calls().len();

    assert!(controller.destroy(true).await);
    let second: Vec<String> = fixture.azure.calls()[after_first..].to_vec();
    assert_eq!(second, vec!["resource_group_exists"]);
}

#[tokio::test]
async fn kept_group_is_emptied_but_not_deleted() {
    let fixture = Fixture::new().with_azure(existing_cluster());

    assert!(fixture.controller().destroy(false).await);
    assert!(fixture.azure.has_resource_group(RESOURCE_GROUP));
    assert!(fixture.azure.resources_in(RESOURCE_GROUP).is_empty());

    // Nothing left to delete on the next run
    assert!(fixture.controller().destroy(false).await);
    assert_eq!(fixture.azure.call_count("delete_resources"), 1);
}

#[tokio::test]
async fn local_state_is_cleared_even_when_remote_deletion_fails() {
    let fixture =
        Fixture::new().with_azure(existing_cluster().failing("delete_resources"));
    fixture.seed_local_state();

    assert!(!fixture.controller().destroy(true).await);
    assert!(!fixture.has_local_state());
    assert_eq!(fixture.azure.call_count("delete_resource_group"), 0);
}

#[tokio::test]
async fn empty_resource_group_is_refused() {
    let fixture = Fixture::new().with_azure(existing_cluster());
    fixture.seed_local_state();
    let controller = fixture.controller_for(ClusterIdentity::new(CLUSTER_NAME, "", REGION));

    assert!(!controller.destroy(true).await);
    assert!(fixture.azure.calls().is_empty());
    assert!(fixture.has_local_state());
}

#[tokio::test]
async fn missing_group_only_clears_local_state() {
    let fixture = Fixture::new().with_azure(MockAzureClient::new());
    fixture.seed_local_state();

    assert!(fixture.controller().destroy(true).await);
    assert_eq!(fixture.azure.calls(), vec!["resource_group_exists"]);
    assert!(!fixture.has_local_state());
}
