//! Lifecycle error taxonomy.
//!
//! Every workflow entry point converts these into a boolean outcome after
//! logging them; none of them escapes to the caller.

use azure_client::AzureError;
use cluster_client::ClusterClientError;
use cluster_model::ModelError;
use std::fmt;
use terraform_client::TerraformError;
use thiserror::Error;

/// Errors that can end a lifecycle workflow.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Bad input or missing tool; never touches remote state
    #[error("{0}")]
    Precondition(String),

    /// Cloud session or account lookup failed
    #[error("{0}")]
    Auth(String),

    /// Not enough cores for the requested topology
    #[error("Looks like you don't have enough cores available in your subscription. {0}")]
    Quota(String),

    /// A provisioning step failed; `kind` names the failing boundary
    #[error("{kind}: {message}")]
    Provisioning {
        /// Boundary error type
        kind: &'static str,
        /// Boundary message, verbatim
        message: String,
    },

    /// The state backend came back without a name, container or key
    #[error("Couldn't create storage account for Terraform backend. Refusing to create cluster.")]
    NoBackend,

    /// The user-file storage account has no usable connection string
    #[error("Couldn't get storage connection string")]
    NoConnectionString,

    /// The user declined to replace the existing cluster
    #[error("Previous cluster exists. Cancelled.")]
    Cancelled,

    /// Neither the ingress nor the provisioner knows the service URL
    #[error("Couldn't get URL for your AKS Cluster")]
    NoUrl,

    /// The action needs an existing cluster
    #[error("Cluster does not exist. Please create it first.")]
    ClusterMissing,

    /// No kubeconfig context is known for the cluster
    #[error("Couldn't get Kubernetes config context")]
    MissingContext,

    /// Cluster API call failed
    #[error("Kubernetes error: {0}")]
    Cluster(#[from] ClusterClientError),

    /// Local state error
    #[error("{0}")]
    Model(#[from] ModelError),
}

impl LifecycleError {
    /// Session failure with the boundary message
    pub fn auth(err: impl fmt::Display) -> Self {
        LifecycleError::Auth(err.to_string())
    }

    /// Failure of a provisioning step at the cloud boundary
    pub fn cloud(err: AzureError) -> Self {
        match err {
            AzureError::Quota(shortfall) => LifecycleError::Quota(shortfall.to_string()),
            AzureError::NotLoggedIn(message) => LifecycleError::Auth(message),
            other => LifecycleError::Provisioning {
                kind: "AzureError",
                message: other.to_string(),
            },
        }
    }

    /// Whether the failure happened before any remote state was touched
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LifecycleError::Precondition(_) | LifecycleError::Auth(_) | LifecycleError::Quota(_)
        )
    }
}

impl From<TerraformError> for LifecycleError {
    fn from(err: TerraformError) -> Self {
        match err {
            TerraformError::Azure(azure) => LifecycleError::cloud(azure),
            other => LifecycleError::Provisioning {
                kind: "TerraformError",
                message: other.to_string(),
            },
        }
    }
}

impl From<AzureError> for LifecycleError {
    fn from(err: AzureError) -> Self {
        LifecycleError::cloud(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_model::QuotaShortfall;
    use host_env::ToolError;

    fn tool_failure() -> ToolError {
        ToolError::Failed {
            tool: "terraform".to_string(),
            command: "apply -auto-approve".to_string(),
            code: Some(1),
            stderr: "Error: creating Managed Cluster".to_string(),
        }
    }

    #[test]
    fn quota_shortfall_keeps_cores_message() {
        let err = LifecycleError::from(AzureError::Quota(QuotaShortfall {
            region: "eastus".to_string(),
            quota: "cores".to_string(),
            limit: 10,
            current: 8,
            required: 28,
        }));
        assert!(err.is_precondition());
        let message = err.to_string();
        assert!(message.starts_with("Looks like you don't have enough cores"));
        assert!(message.contains("'cores'"));
    }

    #[test]
    fn provisioning_failures_name_their_boundary() {
        let err = LifecycleError::from(TerraformError::Tool(tool_failure()));
        assert!(!err.is_precondition());
        assert!(err.to_string().starts_with("TerraformError: "));
        assert!(err.to_string().contains("creating Managed Cluster"));

        let err = LifecycleError::from(AzureError::Tool(tool_failure()));
        assert!(err.to_string().starts_with("AzureError: "));
    }

    #[test]
    fn cloud_errors_inside_the_provisioner_keep_their_class() {
        let err = LifecycleError::from(TerraformError::Azure(AzureError::NotLoggedIn(
            "run az login".to_string(),
        )));
        assert!(matches!(err, LifecycleError::Auth(_)));
    }
}
