use super::*;
use azure_client::MockAzureClient;
use std::path::Path;

fn backend() -> BackendStorage {
    BackendStorage {
        storage_name: "aksremotestate".to_string(),
        container_name: "tfstate".to_string(),
        access_key: "state-key".to_string(),
    }
}

fn infra_inputs() -> InfraInputs {
    InfraInputs {
        tenant_id: "tenant".to_string(),
        subscription_id: "sub".to_string(),
        region: "eastus".to_string(),
        cluster_name: "vibes".to_string(),
        resource_group: "vibes-rg".to_string(),
        max_worker_nodes: 3,
        backend: backend(),
    }
}

struct Fixture {
    config: tempfile::TempDir,
    host: HostEnvironment,
    log: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let config = tempfile::tempdir().unwrap();
        let host = HostEnvironment::discover(Some(config.path().to_path_buf()), None)
            .unwrap()
            .with_path_var(std::env::var_os("PATH"));
        for layer in Layer::ALL {
            std::fs::create_dir_all(host.terraform_modules_dir().join(layer.as_str())).unwrap();
        }
        let log = config.path().join("terraform.log");
        Self { config, host, log }
    }

    fn client(&self, azure: MockAzureClient) -> TerraformClient {
        TerraformClient::new(&self.host, Arc::new(azure))
    }

    fn logged(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Install a fake `terraform` in the config directory that logs its
/// arguments (without `-chdir`) and prints `outputs` for `output -json`.
#[cfg(unix)]
fn install_fake_terraform(dir: &Path, log: &Path, outputs: &str) {
    use std::os::unix::fs::PermissionsExt;

    let outputs_file = dir.join("outputs.json");
    std::fs::write(&outputs_file, outputs).unwrap();
    let script = format!(
        "#!/bin/sh\n\
         shift\n\
         echo \"$*\" >> '{log}'\n\
         case \"$*\" in\n\
         \"output -json\") cat '{outputs}' ;;\n\
         init*) mkdir -p \"$TF_DATA_DIR\" && touch \"$TF_DATA_DIR/terraform.tfstate\" ;;\n\
         esac\n",
        log = log.display(),
        outputs = outputs_file.display(),
    );
    let path = dir.join("terraform");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn cleanup_state_wipes_layer_data_dir() {
    let fixture = Fixture::new();
    let client = fixture.client(MockAzureClient::new());
    let data_dir = fixture.host.terraform_state_dir().join("infra");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("terraform.tfstate"), "{}").unwrap();

    client.prepare_data_dir(Layer::Infra, false).unwrap();
    assert!(data_dir.join("terraform.tfstate").exists());

    client.prepare_data_dir(Layer::Infra, true).unwrap();
    assert!(data_dir.exists());
    assert!(!data_dir.join("terraform.tfstate").exists());
}

#[test]
fn remote_layers_use_backend_container() {
    let fixture = Fixture::new();
    let client = fixture.client(MockAzureClient::new());

    let remote = client.backend_config_args(Layer::Services, Some(&backend()), "ws");
    assert!(remote.contains(&"-backend-config=storage_account_name=aksremotestate".to_string()));
    assert!(remote.contains(&"-backend-config=key=services.tfstate".to_string()));

    let local = client.backend_config_args(Layer::ResourceGroup, None, "vibes-rg");
    assert_eq!(local.len(), 1);
    assert!(local[0].ends_with("resource_group/vibes-rg.tfstate"));
}

#[tokio::test]
async fn layers_require_an_acquired_workspace() {
    let fixture = Fixture::new();
    let client = fixture.client(MockAzureClient::new());

    let err = client.ensure_infra(&infra_inputs(), true).await.unwrap_err();
    assert!(matches!(err, TerraformError::NoWorkspace));
}

#[tokio::test]
async fn missing_module_is_reported() {
    let fixture = Fixture::new();
    std::fs::remove_dir_all(fixture.host.terraform_modules_dir().join("infra")).unwrap();
    let client = fixture.client(MockAzureClient::new());
    let identity = ClusterIdentity::new("vibes", "vibes-rg", "eastus");
    client.acquire_workspace(&identity).await.unwrap();

    let err = client.ensure_infra(&infra_inputs(), false).await.unwrap_err();
    assert!(matches!(err, TerraformError::MissingModule { .. }));
    client.release_workspace().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn infra_layer_runs_in_scoped_workspace() {
    let fixture = Fixture::new();
    install_fake_terraform(
        fixture.config.path(),
        &fixture.log,
        r#"{"public_ip_fqdn": {"sensitive": false, "type": "string", "value": "vibes.eastus.cloudapp.azure.com"},
            "worker_node_pool_cores": {"sensitive": false, "type": "number", "value": 16}}"#,
    );
    let client = fixture.client(MockAzureClient::new());
    let identity = ClusterIdentity::new("vibes", "vibes-rg", "eastus");

    let workspace = client.acquire_workspace(&identity).await.unwrap();
    assert_eq!(workspace, "aks-remote-vibes-vibes-rg");

    let outputs = client.ensure_infra(&infra_inputs(), true).await.unwrap();
    assert_eq!(
        outputs.get(keys::PUBLIC_IP_FQDN),
        Some("vibes.eastus.cloudapp.azure.com")
    );
    client.release_workspace().await.unwrap();

    let calls = fixture.logged();
    assert!(calls[0].starts_with("init -reconfigure -input=false"));
    assert_eq!(calls[1], "workspace select -or-create aks-remote-vibes-vibes-rg");
    assert_eq!(calls[2], "apply -auto-approve -input=false");
    assert_eq!(calls[3], "output -json");
    assert_eq!(calls[4], "workspace select default");
    assert!(calls.iter().all(|c| !c.contains("TF_VAR")));
}

#[cfg(unix)]
#[tokio::test]
async fn release_without_layers_runs_nothing() {
    let fixture = Fixture::new();
    install_fake_terraform(fixture.config.path(), &fixture.log, "{}");
    let client = fixture.client(MockAzureClient::new());
    let identity = ClusterIdentity::new("vibes", "vibes-rg", "eastus");

    client.acquire_workspace(&identity).await.unwrap();
    client.release_workspace().await.unwrap();
    // A second release is a no-op
    client.release_workspace().await.unwrap();

    assert!(fixture.logged().is_empty());
}

fn resource_group_inputs() -> ResourceGroupInputs {
    ResourceGroupInputs {
        tenant_id: "tenant".to_string(),
        subscription_id: "sub".to_string(),
        region: "eastus".to_string(),
        cluster_name: "vibes".to_string(),
        resource_group: "vibes-rg".to_string(),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn new_resource_group_is_applied_with_local_state() {
    let fixture = Fixture::new();
    install_fake_terraform(fixture.config.path(), &fixture.log, "{}");

    let client = fixture.client(MockAzureClient::new());
    assert!(client.ensure_resource_group(&resource_group_inputs()).await.unwrap());

    let calls = fixture.logged();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("init -reconfigure -input=false -backend-config=path="));
    assert!(calls[0].ends_with("resource_group/vibes-rg.tfstate"));
    assert_eq!(calls[1], "apply -auto-approve -input=false");
}

#[cfg(unix)]
#[tokio::test]
async fn existing_resource_group_is_left_alone() {
    let fixture = Fixture::new();
    install_fake_terraform(fixture.config.path(), &fixture.log, "{}");
    // Teardown kept the group but cleared its local state
    let azure = MockAzureClient::new().with_resource_group("vibes-rg");
    let client = fixture.client(azure.clone());

    assert!(!client.ensure_resource_group(&resource_group_inputs()).await.unwrap());
    assert!(fixture.logged().is_empty());
    assert_eq!(azure.calls(), vec!["resource_group_exists"]);

    // Same answer on a second run, still without touching Terraform
    assert!(!client.ensure_resource_group(&resource_group_inputs()).await.unwrap());
    assert!(fixture.logged().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn queries_read_recorded_outputs() {
    let fixture = Fixture::new();
    install_fake_terraform(
        fixture.config.path(),
        &fixture.log,
        r#"{"public_ip_fqdn": {"sensitive": false, "type": "string", "value": "vibes.eastus.cloudapp.azure.com"},
            "kubernetes_config_context": {"sensitive": false, "type": "string", "value": "vibes-ctx"},
            "worker_node_pool_cores": {"sensitive": false, "type": "number", "value": 16},
            "default_node_pool_cores": {"sensitive": false, "type": "number", "value": 4}}"#,
    );
    let client = fixture.client(MockAzureClient::new());
    let identity = ClusterIdentity::new("vibes", "vibes-rg", "eastus");

    // Nothing initialized yet
    assert_eq!(client.get_url_from_terraform_output(&identity).await.unwrap(), None);
    assert_eq!(client.get_current_core_count(&identity).await.unwrap(), (0, 0));

    client.acquire_workspace(&identity).await.unwrap();
    client.ensure_infra(&infra_inputs(), false).await.unwrap();
    client.release_workspace().await.unwrap();

    assert_eq!(
        client.get_url_from_terraform_output(&identity).await.unwrap().as_deref(),
        Some("https://vibes.eastus.cloudapp.azure.com")
    );
    assert_eq!(
        client.get_kubernetes_config_context(&identity).await.unwrap().as_deref(),
        Some("vibes-ctx")
    );
    assert_eq!(client.get_current_core_count(&identity).await.unwrap(), (16, 4));
    assert_eq!(client.get_storage_account_name(&identity).await.unwrap(), None);
}

#[tokio::test]
async fn backend_storage_comes_from_cloud_client() {
    let fixture = Fixture::new();
    let client = fixture.client(MockAzureClient::new());
    let backend = client.ensure_backend_storage("eastus").await.unwrap();
    assert!(backend.is_complete());
}
