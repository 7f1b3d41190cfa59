//! Azure CLI client
//!
//! Every operation is one or more `az` invocations run through the host
//! environment's [`ToolRunner`], so the CLI sees the augmented search path
//! and its stderr is surfaced verbatim on failure.

use crate::azure_trait::AzureClientTrait;
use crate::error::AzureError;
use crate::models::{Account, RegistryCredentials, ResourceSummary, UsageEntry};
use cluster_model::{BackendStorage, ClusterIdentity, CoreUsage, CredentialBundle};
use host_env::{ToolError, ToolInvocation, ToolRunner};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, warn};

/// Resource providers the cluster's resources are created through
const RESOURCE_PROVIDERS: [&str; 5] = [
    "Microsoft.ContainerService",
    "Microsoft.Compute",
    "Microsoft.Network",
    "Microsoft.Storage",
    "Microsoft.KeyVault",
];

/// Prefix of the resource group holding the state backend
const STATE_RESOURCE_GROUP_PREFIX: &str = "aks-remote-state";
/// Prefix of the state backend storage account
const STATE_ACCOUNT_PREFIX: &str = "aksremote";
/// Blob container holding state files
const STATE_CONTAINER: &str = "tfstate";
/// Storage account names are at most 24 characters
const STORAGE_ACCOUNT_MAX_LEN: usize = 24;

/// stderr fragments `az` prints when a resource does not exist
const NOT_FOUND_MARKERS: [&str; 3] = [
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "could not be found",
];

/// Azure client backed by the `az` CLI
#[derive(Debug, Clone)]
pub struct AzureCliClient {
    runner: ToolRunner,
}

impl AzureCliClient {
    /// Create a client running `az` through `runner`
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    async fn az(&self, args: &[&str]) -> Result<String, AzureError> {
        let invocation = ToolInvocation::new("az").args(args.iter().copied());
        Ok(self.runner.run(&invocation).await?)
    }

    async fn az_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, AzureError> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--output", "json"]);
        let stdout = self.az(&full).await?;
        Ok(serde_json::from_str(&stdout)?)
    }

    async fn az_tsv(&self, args: &[&str]) -> Result<String, AzureError> {
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["--output", "tsv"]);
        Ok(self.az(&full).await?.trim().to_string())
    }

    /// Names of the state backend resource group and storage account for a
    /// subscription and region.
    pub fn state_backend_names(subscription_id: &str, region: &str) -> (String, String) {
        let resource_group = format!("{STATE_RESOURCE_GROUP_PREFIX}-{region}");
        let digest = format!("{:016x}", fnv1a(&format!("{subscription_id}/{region}")));
        let suffix_len = STORAGE_ACCOUNT_MAX_LEN - STATE_ACCOUNT_PREFIX.len();
        let account = format!("{STATE_ACCOUNT_PREFIX}{}", &digest[..suffix_len]);
        (resource_group, account)
    }
}

/// 64-bit FNV-1a, stable across toolchains
fn fnv1a(input: &str) -> u64 {
    input.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn is_not_found(err: &AzureError) -> bool {
    match err {
        AzureError::Tool(tool) => NOT_FOUND_MARKERS.iter().any(|m| tool.stderr().contains(m)),
        _ => false,
    }
}

#[async_trait::async_trait]
impl AzureClientTrait for AzureCliClient {
    async fn ensure_session(&self) -> Result<(), AzureError> {
        debug!("Checking Azure CLI session");
        match self
            .az(&["account", "get-access-token", "--output", "none"])
            .await
        {
            Ok(_) => Ok(()),
            Err(AzureError::Tool(ToolError::Failed { stderr, .. })) => {
                Err(AzureError::NotLoggedIn(stderr))
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_resource_providers(&self, region: &str) -> Result<(), AzureError> {
        for namespace in RESOURCE_PROVIDERS {
            let state = self
                .az_tsv(&[
                    "provider",
                    "show",
                    "--namespace",
                    namespace,
                    "--query",
                    "registrationState",
                ])
                .await?;
            if state.eq_ignore_ascii_case("Registered") {
                debug!("Resource provider {} already registered", namespace);
                continue;
            }
            info!(
                "Registering resource provider {} (needed in {})",
                namespace, region
            );
            self.az(&["provider", "register", "--namespace", namespace, "--wait"])
                .await?;
        }
        Ok(())
    }

    async fn core_usage(&self, region: &str) -> Result<Vec<CoreUsage>, AzureError> {
        let entries: Vec<UsageEntry> = self
            .az_json(&["vm", "list-usage", "--location", region])
            .await?;
        Ok(entries.into_iter().map(CoreUsage::from).collect())
    }

    async fn current_user_name(&self) -> Result<String, AzureError> {
        match self
            .az_tsv(&["ad", "signed-in-user", "show", "--query", "userPrincipalName"])
            .await
        {
            Ok(name) if !name.is_empty() => Ok(name),
            // Service principals have no directory user; fall back to the account
            _ => {
                let account = self.account().await?;
                account
                    .user
                    .map(|u| u.name)
                    .ok_or_else(|| {
                        AzureError::UnexpectedResponse("account has no user".to_string())
                    })
            }
        }
    }

    async fn account(&self) -> Result<Account, AzureError> {
        self.az_json(&["account", "show"]).await
    }

    async fn cluster_exists(&self, identity: &ClusterIdentity) -> Result<bool, AzureError> {
        let result = self
            .az(&[
                "aks",
                "show",
                "--name",
                identity.cluster_name(),
                "--resource-group",
                identity.resource_group(),
                "--output",
                "none",
            ])
            .await;
        match result {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn refresh_cluster_credentials(
        &self,
        identity: &ClusterIdentity,
        kubeconfig: &Path,
    ) -> Result<(), AzureError> {
        let file = kubeconfig.display().to_string();
        self.az(&[
            "aks",
            "get-credentials",
            "--name",
            identity.cluster_name(),
            "--resource-group",
            identity.resource_group(),
            "--file",
            &file,
            "--overwrite-existing",
        ])
        .await?;

        let convert = ToolInvocation::new("kubelogin").args([
            "convert-kubeconfig",
            "-l",
            "azurecli",
            "--kubeconfig",
            &file,
        ]);
        self.runner.run(&convert).await?;
        debug!("Refreshed credentials for {} in {}", identity, file);
        Ok(())
    }

    async fn ensure_state_backend(&self, region: &str) -> Result<BackendStorage, AzureError> {
        let account = self.account().await?;
        let (resource_group, storage_name) = Self::state_backend_names(&account.id, region);

        if !self.resource_group_exists(&resource_group).await? {
            self.create_resource_group(&resource_group, region).await?;
        }

        let exists = self
            .az(&[
                "storage",
                "account",
                "show",
                "--name",
                &storage_name,
                "--resource-group",
                &resource_group,
                "--output",
                "none",
            ])
            .await;
        match exists {
            Ok(_) => debug!("State storage account {} exists", storage_name),
            Err(e) if is_not_found(&e) => {
                info!("Creating state storage account {}", storage_name);
                self.az(&[
                    "storage",
                    "account",
                    "create",
                    "--name",
                    &storage_name,
                    "--resource-group",
                    &resource_group,
                    "--location",
                    region,
                    "--sku",
                    "Standard_LRS",
                    "--encryption-services",
                    "blob",
                    "--min-tls-version",
                    "TLS1_2",
                    "--output",
                    "none",
                ])
                .await?;
            }
            Err(e) => return Err(e),
        }

        let access_key = self
            .az_tsv(&[
                "storage",
                "account",
                "keys",
                "list",
                "--account-name",
                &storage_name,
                "--resource-group",
                &resource_group,
                "--query",
                "[0].value",
            ])
            .await?;

        self.az(&[
            "storage",
            "container",
            "create",
            "--name",
            STATE_CONTAINER,
            "--account-name",
            &storage_name,
            "--account-key",
            &access_key,
            "--output",
            "none",
        ])
        .await?;

        Ok(BackendStorage {
            storage_name,
            container_name: STATE_CONTAINER.to_string(),
            access_key,
        })
    }

    async fn registry_credentials(
        &self,
        registry: &CredentialBundle,
    ) -> Result<(String, String), AzureError> {
        let name = registry.managed_registry_name()?;
        let credentials: RegistryCredentials = self
            .az_json(&["acr", "credential", "show", "--name", name])
            .await?;
        let password = credentials
            .passwords
            .into_iter()
            .next()
            .map(|p| p.value)
            .ok_or_else(|| {
                AzureError::UnexpectedResponse(format!("registry {name} has no admin password"))
            })?;
        Ok((credentials.username, password))
    }

    async fn storage_connection_string(
        &self,
        identity: &ClusterIdentity,
        storage_account: &str,
    ) -> Result<Option<String>, AzureError> {
        let connection_string = self
            .az_tsv(&[
                "storage",
                "account",
                "show-connection-string",
                "--name",
                storage_account,
                "--resource-group",
                identity.resource_group(),
                "--query",
                "connectionString",
            ])
            .await?;
        Ok(Some(connection_string).filter(|s| !s.is_empty()))
    }

    async fn upload_file(
        &self,
        source: &Path,
        connection_string: &str,
        container: &str,
        destination: &str,
    ) -> Result<(), AzureError> {
        let file = source.display().to_string();
        self.az(&[
            "storage",
            "blob",
            "upload",
            "--file",
            &file,
            "--container-name",
            container,
            "--name",
            destination,
            "--connection-string",
            connection_string,
            "--overwrite",
            "--output",
            "none",
        ])
        .await?;
        Ok(())
    }

    async fn resource_group_exists(&self, resource_group: &str) -> Result<bool, AzureError> {
        let answer = self
            .az(&["group", "exists", "--name", resource_group])
            .await?;
        Ok(answer.trim().eq_ignore_ascii_case("true"))
    }

    async fn create_resource_group(
        &self,
        resource_group: &str,
        region: &str,
    ) -> Result<(), AzureError> {
        info!("Creating resource group {} in {}", resource_group, region);
        self.az(&[
            "group",
            "create",
            "--name",
            resource_group,
            "--location",
            region,
            "--output",
            "none",
        ])
        .await?;
        Ok(())
    }

    async fn list_resources(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ResourceSummary>, AzureError> {
        self.az_json(&["resource", "list", "--resource-group", resource_group])
            .await
    }

    async fn delete_resources(&self, ids: &[String]) -> Result<(), AzureError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["resource", "delete", "--ids"];
        args.extend(ids.iter().map(String::as_str));
        args.extend(["--output", "none"]);
        if let Err(e) = self.az(&args).await {
            // Dependent resources may already be gone with their parent
            if is_not_found(&e) {
                warn!("Some resources were already deleted: {}", e);
                return Ok(());
            }
            return Err(e);
        }
        Ok(())
    }

    async fn delete_resource_group(&self, resource_group: &str) -> Result<(), AzureError> {
        info!("Deleting resource group {}", resource_group);
        self.az(&["group", "delete", "--name", resource_group, "--yes"])
            .await?;
        Ok(())
    }
}
