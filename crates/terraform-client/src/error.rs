//! Provisioner errors

use azure_client::AzureError;
use cluster_model::ModelError;
use host_env::ToolError;
use thiserror::Error;

/// Errors that can occur while provisioning a layer
#[derive(Debug, Error)]
pub enum TerraformError {
    /// A Terraform command failed; message carries its stderr
    #[error("Terraform error: {0}")]
    Tool(#[from] ToolError),

    /// A cloud-side step of the layer failed
    #[error("{0}")]
    Azure(#[from] AzureError),

    /// `terraform output -json` could not be decoded
    #[error("failed to decode Terraform outputs: {0}")]
    Output(#[from] serde_json::Error),

    /// A layer did not produce an output a later layer needs
    #[error("{0}")]
    Model(#[from] ModelError),

    /// A workspace-scoped layer ran without an acquired workspace
    #[error("no Terraform workspace acquired")]
    NoWorkspace,

    /// Layer module missing from the modules directory
    #[error("Terraform module for layer '{layer}' not found at {path}")]
    MissingModule {
        /// Layer name
        layer: String,
        /// Expected module directory
        path: String,
    },

    /// Local state directory error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
