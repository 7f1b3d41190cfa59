//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the cluster
#[derive(Debug, Error)]
pub enum ClusterClientError {
    /// The kubeconfig could not be read or the context resolved
    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Secret to delete does not exist
    #[error("secret '{0}' not found")]
    SecretNotFound(String),

    /// Name is not a valid Kubernetes object name
    #[error("invalid secret name '{0}': use lowercase alphanumerics, '-' or '.'")]
    InvalidName(String),
}
