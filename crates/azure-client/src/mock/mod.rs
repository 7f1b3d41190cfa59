//! Mock AzureClient for unit testing
//!
//! Keeps the subscription in memory: resource groups with their resources,
//! clusters, storage accounts and registries. Every trait call is recorded
//! by name so tests can assert which cloud operations ran (and which did
//! not). Individual operations can be scripted to fail.

use crate::azure_trait::AzureClientTrait;
use crate::error::AzureError;
use crate::models::{Account, AccountUser, ResourceSummary};
use cluster_model::{BackendStorage, ClusterIdentity, CoreUsage, CredentialBundle};
use host_env::ToolError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    logged_in: bool,
    user_name: String,
    account: Option<Account>,
    usages: Vec<CoreUsage>,
    clusters: BTreeSet<(String, String)>,
    resource_groups: BTreeMap<String, Vec<ResourceSummary>>,
    connection_strings: HashMap<String, String>,
    registries: HashMap<String, (String, String)>,
    backend: BackendStorage,
    uploads: Vec<Upload>,
    refreshed: Vec<PathBuf>,
    failing: BTreeSet<String>,
    calls: Vec<String>,
}

/// Blob upload recorded by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Local file
    pub source: PathBuf,
    /// Target container
    pub container: String,
    /// Blob name
    pub destination: String,
}

/// Mock AzureClient for testing
#[derive(Debug, Clone)]
pub struct MockAzureClient {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockAzureClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAzureClient {
    /// Logged-in subscription with ample quota and a complete state backend
    pub fn new() -> Self {
        let state = MockState {
            logged_in: true,
            user_name: "user@example.com".to_string(),
            account: Some(Account {
                id: "00000000-0000-0000-0000-000000000000".to_string(),
                tenant_id: "11111111-1111-1111-1111-111111111111".to_string(),
                user: Some(AccountUser {
                    name: "user@example.com".to_string(),
                }),
            }),
            usages: vec![
                CoreUsage {
                    name: "cores".to_string(),
                    current: 0,
                    limit: 1000,
                },
                CoreUsage {
                    name: "standardDSv3Family".to_string(),
                    current: 0,
                    limit: 1000,
                },
            ],
            backend: BackendStorage {
                storage_name: "aksremotestate".to_string(),
                container_name: "tfstate".to_string(),
                access_key: "state-key".to_string(),
            },
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and fail it when scripted to
    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, MockState>, AzureError> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            return Err(AzureError::Tool(ToolError::Failed {
                tool: "az".to_string(),
                command: operation.to_string(),
                code: Some(1),
                stderr: format!("mock failure in {operation}"),
            }));
        }
        Ok(state)
    }

    // Setup

    /// Drop the login session
    pub fn logged_out(self) -> Self {
        self.lock().logged_in = false;
        self
    }

    /// Replace the usage report
    pub fn with_usage(self, usages: Vec<CoreUsage>) -> Self {
        self.lock().usages = usages;
        self
    }

    /// Remove the account (subscription lookups fail)
    pub fn without_account(self) -> Self {
        self.lock().account = None;
        self
    }

    /// Add an existing cluster together with its resource group and resources
    pub fn with_cluster(self, identity: &ClusterIdentity, resources: Vec<ResourceSummary>) -> Self {
        {
            let mut state = self.lock();
            state.clusters.insert((
                identity.resource_group().to_string(),
                identity.cluster_name().to_string(),
            ));
            state
                .resource_groups
                .entry(identity.resource_group().to_string())
                .or_default()
                .extend(resources);
        }
        self
    }

    /// Add an empty resource group
    pub fn with_resource_group(self, resource_group: &str) -> Self {
        self.lock()
            .resource_groups
            .entry(resource_group.to_string())
            .or_default();
        self
    }

    /// Register a storage account connection string
    pub fn with_connection_string(self, account: &str, connection_string: &str) -> Self {
        self.lock()
            .connection_strings
            .insert(account.to_string(), connection_string.to_string());
        self
    }

    /// Register admin credentials of a managed registry
    pub fn with_registry(self, name: &str, username: &str, password: &str) -> Self {
        self.lock()
            .registries
            .insert(name.to_string(), (username.to_string(), password.to_string()));
        self
    }

    /// Replace the state backend returned by `ensure_state_backend`
    pub fn with_backend(self, backend: BackendStorage) -> Self {
        self.lock().backend = backend;
        self
    }

    /// Make `operation` (a trait method name) fail
    pub fn failing(self, operation: &str) -> Self {
        self.lock().failing.insert(operation.to_string());
        self
    }

    // Inspection

    /// Names of every trait call so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How often `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }

    /// Whether `resource_group` currently exists
    pub fn has_resource_group(&self, resource_group: &str) -> bool {
        self.lock().resource_groups.contains_key(resource_group)
    }

    /// Resources left in `resource_group`
    pub fn resources_in(&self, resource_group: &str) -> Vec<ResourceSummary> {
        self.lock()
            .resource_groups
            .get(resource_group)
            .cloned()
            .unwrap_or_default()
    }

    /// Uploads performed so far
    pub fn uploads(&self) -> Vec<Upload> {
        self.lock().uploads.clone()
    }

    /// Kubeconfig paths credentials were written to
    pub fn refreshed_kubeconfigs(&self) -> Vec<PathBuf> {
        self.lock().refreshed.clone()
    }
}

/// Resource fixture
pub fn resource(resource_group: &str, name: &str, resource_type: &str) -> ResourceSummary {
    ResourceSummary {
        id: format!(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/{resource_group}/providers/{resource_type}/{name}"
        ),
        name: name.to_string(),
        resource_type: resource_type.to_string(),
    }
}

#[async_trait::async_trait]
impl AzureClientTrait for MockAzureClient {
    async fn ensure_session(&self) -> Result<(), AzureError> {
        let state = self.enter("ensure_session")?;
        if state.logged_in {
            Ok(())
        } else {
            Err(AzureError::NotLoggedIn(
                "Please run 'az login' to setup account.".to_string(),
            ))
        }
    }

    async fn ensure_resource_providers(&self, _region: &str) -> Result<(), AzureError> {
        self.enter("ensure_resource_providers")?;
        Ok(())
    }

    async fn core_usage(&self, _region: &str) -> Result<Vec<CoreUsage>, AzureError> {
        Ok(self.enter("core_usage")?.usages.clone())
    }

    async fn current_user_name(&self) -> Result<String, AzureError> {
        Ok(self.enter("current_user_name")?.user_name.clone())
    }

    async fn account(&self) -> Result<Account, AzureError> {
        self.enter("account")?
            .account
            .clone()
            .ok_or_else(|| AzureError::NotLoggedIn("no active subscription".to_string()))
    }

    async fn cluster_exists(&self, identity: &ClusterIdentity) -> Result<bool, AzureError> {
        let state = self.enter("cluster_exists")?;
        Ok(state.clusters.contains(&(
            identity.resource_group().to_string(),
            identity.cluster_name().to_string(),
        )))
    }

    async fn refresh_cluster_credentials(
        &self,
        identity: &ClusterIdentity,
        kubeconfig: &Path,
    ) -> Result<(), AzureError> {
        let mut state = self.enter("refresh_cluster_credentials")?;
        let key = (
            identity.resource_group().to_string(),
            identity.cluster_name().to_string(),
        );
        if !state.clusters.contains(&key) {
            return Err(AzureError::Tool(ToolError::Failed {
                tool: "az".to_string(),
                command: "aks get-credentials --name".to_string(),
                code: Some(3),
                stderr: format!("(ResourceNotFound) cluster {identity} not found"),
            }));
        }
        state.refreshed.push(kubeconfig.to_path_buf());
        Ok(())
    }

    async fn ensure_state_backend(&self, _region: &str) -> Result<BackendStorage, AzureError> {
        Ok(self.enter("ensure_state_backend")?.backend.clone())
    }

    async fn registry_credentials(
        &self,
        registry: &CredentialBundle,
    ) -> Result<(String, String), AzureError> {
        let state = self.enter("registry_credentials")?;
        let name = registry.managed_registry_name()?;
        state.registries.get(name).cloned().ok_or_else(|| {
            AzureError::UnexpectedResponse(format!("registry {name} has no admin user"))
        })
    }

    async fn storage_connection_string(
        &self,
        _identity: &ClusterIdentity,
        storage_account: &str,
    ) -> Result<Option<String>, AzureError> {
        Ok(self
            .enter("storage_connection_string")?
            .connection_strings
            .get(storage_account)
            .cloned()
            .filter(|s| !s.is_empty()))
    }

    async fn upload_file(
        &self,
        source: &Path,
        _connection_string: &str,
        container: &str,
        destination: &str,
    ) -> Result<(), AzureError> {
        self.enter("upload_file")?.uploads.push(Upload {
            source: source.to_path_buf(),
            container: container.to_string(),
            destination: destination.to_string(),
        });
        Ok(())
    }

    async fn resource_group_exists(&self, resource_group: &str) -> Result<bool, AzureError> {
        Ok(self
            .enter("resource_group_exists")?
            .resource_groups
            .contains_key(resource_group))
    }

    async fn create_resource_group(
        &self,
        resource_group: &str,
        _region: &str,
    ) -> Result<(), AzureError> {
        self.enter("create_resource_group")?
            .resource_groups
            .entry(resource_group.to_string())
            .or_default();
        Ok(())
    }

    async fn list_resources(
        &self,
        resource_group: &str,
    ) -> Result<Vec<ResourceSummary>, AzureError> {
        Ok(self
            .enter("list_resources")?
            .resource_groups
            .get(resource_group)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_resources(&self, ids: &[String]) -> Result<(), AzureError> {
        let mut state = self.enter("delete_resources")?;
        for resources in state.resource_groups.values_mut() {
            resources.retain(|r| !ids.contains(&r.id));
        }
        // A cluster is gone once its managed cluster resource is deleted
        let deleted_clusters: Vec<(String, String)> = state
            .clusters
            .iter()
            .filter(|(rg, name)| {
                ids.iter().any(|id| {
                    id.contains(&format!("/resourceGroups/{rg}/"))
                        && id.ends_with(&format!("managedClusters/{name}"))
                })
            })
            .cloned()
            .collect();
        for key in deleted_clusters {
            state.clusters.remove(&key);
        }
        Ok(())
    }

    async fn delete_resource_group(&self, resource_group: &str) -> Result<(), AzureError> {
        let mut state = self.enter("delete_resource_group")?;
        state.resource_groups.remove(resource_group);
        state.clusters.retain(|(rg, _)| rg != resource_group);
        Ok(())
    }
}
