//! Mock ClusterClient for unit testing
//!
//! Keeps secrets and ingress hosts per context in memory and records every
//! call by operation name.

use crate::client::{is_valid_secret_name, pick_ingress_host};
use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterClientError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    ingress_hosts: BTreeMap<String, Vec<String>>,
    secrets: BTreeMap<(String, String), String>,
    failing: BTreeSet<String>,
    calls: Vec<String>,
}

/// Mock ClusterClient for testing
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClusterClient {
    /// Cluster with no ingress hosts and no secrets
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, MockState>, ClusterClientError> {
        let mut state = self.lock();
        state.calls.push(operation.to_string());
        if state.failing.contains(operation) {
            // Any API failure will do; the workflows never inspect it
            return Err(ClusterClientError::SecretNotFound(format!(
                "mock failure in {operation}"
            )));
        }
        Ok(state)
    }

    /// Publish an ingress host in `context`
    pub fn with_ingress_host(self, context: &str, host: &str) -> Self {
        self.lock()
            .ingress_hosts
            .entry(context.to_string())
            .or_default()
            .push(host.to_string());
        self
    }

    /// Make `operation` (a trait method name) fail
    pub fn failing(self, operation: &str) -> Self {
        self.lock().failing.insert(operation.to_string());
        self
    }

    /// Value of secret `name` in `context`
    pub fn secret(&self, context: &str, name: &str) -> Option<String> {
        self.lock()
            .secrets
            .get(&(context.to_string(), name.to_string()))
            .cloned()
    }

    /// Names of every trait call so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// How often `operation` was called
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == operation).count()
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn url_from_ingress(
        &self,
        context: &str,
        cluster_name: &str,
    ) -> Result<Option<String>, ClusterClientError> {
        let state = self.enter("url_from_ingress")?;
        let hosts = state.ingress_hosts.get(context).cloned().unwrap_or_default();
        Ok(pick_ingress_host(&hosts, cluster_name).map(|host| format!("https://{host}")))
    }

    async fn add_secret(
        &self,
        context: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ClusterClientError> {
        let mut state = self.enter("add_secret")?;
        if !is_valid_secret_name(name) {
            return Err(ClusterClientError::InvalidName(name.to_string()));
        }
        state
            .secrets
            .insert((context.to_string(), name.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_secret(&self, context: &str, name: &str) -> Result<(), ClusterClientError> {
        let mut state = self.enter("delete_secret")?;
        state
            .secrets
            .remove(&(context.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClusterClientError::SecretNotFound(name.to_string()))
    }
}
