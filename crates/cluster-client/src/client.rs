//! kube-rs implementation
//!
//! A fresh [`Client`] is built per call from the config-directory kubeconfig
//! and the requested context. The cluster's credentials use the `kubelogin`
//! exec plugin; its command is rewritten to the absolute path found in the
//! host's search directories and the plugin gets the augmented `PATH`, so it
//! works even when the config directory is not on the user's `PATH`.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterClientError;
use cluster_model::constants::SECRET_NAMESPACE;
use host_env::{HostEnvironment, ToolRunner};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, info};

/// Field manager for server-side apply
const FIELD_MANAGER: &str = "aks-remote";
/// Exec plugin rewritten to an absolute path
const KUBELOGIN: &str = "kubelogin";
/// Longest valid object name
const MAX_OBJECT_NAME_LEN: usize = 253;

/// Cluster client backed by kube-rs
#[derive(Debug, Clone)]
pub struct KubeClusterClient {
    kubeconfig_path: PathBuf,
    runner: ToolRunner,
}

impl KubeClusterClient {
    /// Client reading the kubeconfig of `host`
    pub fn new(host: &HostEnvironment) -> Self {
        Self {
            kubeconfig_path: host.kubeconfig_path(),
            runner: host.runner(),
        }
    }

    async fn client_for(&self, context: &str) -> Result<Client, ClusterClientError> {
        let mut kubeconfig = Kubeconfig::read_from(&self.kubeconfig_path)?;
        rewrite_exec_plugins(&mut kubeconfig, &self.runner);

        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
        Ok(Client::try_from(config)?)
    }
}

/// Point `kubelogin` exec entries at the resolved binary and hand them the augmented `PATH`.
pub fn rewrite_exec_plugins(kubeconfig: &mut Kubeconfig, runner: &ToolRunner) {
    let child_path = runner.child_path().to_string_lossy().into_owned();
    for named in &mut kubeconfig.auth_infos {
        let Some(exec) = named.auth_info.as_mut().and_then(|a| a.exec.as_mut()) else {
            continue;
        };
        if exec.command.as_deref() != Some(KUBELOGIN) {
            continue;
        }
        if let Ok(path) = runner.resolve(KUBELOGIN) {
            debug!("Using {} for user {}", path.display(), named.name);
            exec.command = Some(path.display().to_string());
        }
        let env = exec.env.get_or_insert_with(Vec::new);
        env.retain(|entry| entry.get("name").map(String::as_str) != Some("PATH"));
        env.push(HashMap::from([
            ("name".to_string(), "PATH".to_string()),
            ("value".to_string(), child_path.clone()),
        ]));
    }
}

/// Whether `name` is a valid Kubernetes object name (DNS subdomain).
pub fn is_valid_secret_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_OBJECT_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric())
}

/// Host to publish: one starting with the cluster name if any, else the first.
pub fn pick_ingress_host<'a>(hosts: &'a [String], cluster_name: &str) -> Option<&'a str> {
    let hosts: Vec<&str> = hosts
        .iter()
        .map(String::as_str)
        .filter(|h| !h.is_empty())
        .collect();
    hosts
        .iter()
        .find(|h| h.starts_with(cluster_name))
        .or_else(|| hosts.first())
        .copied()
}

/// Opaque secret holding `value` under a key equal to its name.
pub fn secret_manifest(name: &str, value: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(SECRET_NAMESPACE.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            name.to_string(),
            ByteString(value.as_bytes().to_vec()),
        )])),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn url_from_ingress(
        &self,
        context: &str,
        cluster_name: &str,
    ) -> Result<Option<String>, ClusterClientError> {
        let client = self.client_for(context).await?;
        let ingresses: Api<Ingress> = Api::namespaced(client, SECRET_NAMESPACE);
        let list = ingresses.list(&ListParams::default()).await?;

        let hosts: Vec<String> = list
            .items
            .iter()
            .filter_map(|ingress| ingress.spec.as_ref()?.rules.as_ref())
            .flatten()
            .filter_map(|rule| rule.host.clone())
            .collect();
        debug!("Ingress hosts in {}: {:?}", context, hosts);

        Ok(pick_ingress_host(&hosts, cluster_name).map(|host| format!("https://{host}")))
    }

    async fn add_secret(
        &self,
        context: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ClusterClientError> {
        if !is_valid_secret_name(name) {
            return Err(ClusterClientError::InvalidName(name.to_string()));
        }
        let client = self.client_for(context).await?;
        let secrets: Api<Secret> = Api::namespaced(client, SECRET_NAMESPACE);

        let params = PatchParams::apply(FIELD_MANAGER).force();
        secrets
            .patch(name, &params, &Patch::Apply(&secret_manifest(name, value)))
            .await?;
        info!("Secret {} applied", name);
        Ok(())
    }

    async fn delete_secret(&self, context: &str, name: &str) -> Result<(), ClusterClientError> {
        if !is_valid_secret_name(name) {
            return Err(ClusterClientError::InvalidName(name.to_string()));
        }
        let client = self.client_for(context).await?;
        let secrets: Api<Secret> = Api::namespaced(client, SECRET_NAMESPACE);

        if secrets.get_opt(name).await?.is_none() {
            return Err(ClusterClientError::SecretNotFound(name.to_string()));
        }
        secrets.delete(name, &DeleteParams::default()).await?;
        info!("Secret {} deleted", name);
        Ok(())
    }
}
