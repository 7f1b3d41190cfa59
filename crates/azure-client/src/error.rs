//! Azure client errors

use cluster_model::{ModelError, QuotaShortfall};
use host_env::ToolError;
use thiserror::Error;

/// Errors that can occur when talking to the Azure control plane
#[derive(Debug, Error)]
pub enum AzureError {
    /// The `az` invocation failed; message is the CLI's stderr
    #[error("Azure CLI error: {0}")]
    Tool(#[from] ToolError),

    /// No usable login session
    #[error("not logged in to Azure: {0}")]
    NotLoggedIn(String),

    /// Not enough cores for the requested topology
    #[error("insufficient quota: {0}")]
    Quota(#[from] QuotaShortfall),

    /// CLI output could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input (e.g. registry outside the managed domain)
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ModelError),

    /// The CLI answered but without the expected data
    #[error("unexpected Azure CLI response: {0}")]
    UnexpectedResponse(String),
}
