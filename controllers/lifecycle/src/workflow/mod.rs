//! Lifecycle workflows
//!
//! Each submodule extends [`LifecycleController`] with one operator action:
//! - `setup`: create or update the cluster, with the rollback decision
//! - `status`: discover and persist the service URL
//! - `destroy`: idempotent teardown plus local state cleanup
//! - `secrets`: add and delete cluster secrets
//! - `onnx`: upload a model to the user-file storage
//!
//! Public entry points return `bool` after logging any failure.

pub mod destroy;
#[cfg(test)]
mod destroy_test;
pub mod onnx;
pub mod secrets;
pub mod setup;
#[cfg(test)]
mod setup_test;
pub mod status;

pub use setup::SetupRequest;
pub use status::DiscoveredUrl;

use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use cluster_model::{LifecyclePhase, LifecycleState};
use tracing::{debug, error, warn};

/// Log a failed workflow and collapse the outcome to `bool`.
pub(crate) fn report<T>(result: Result<T, LifecycleError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            error!("{}", e);
            false
        }
    }
}

/// Record `next`; an illegal transition is logged, never fatal.
pub(crate) fn transition(state: &mut LifecycleState, next: LifecyclePhase) {
    if let Err(e) = state.advance(next) {
        warn!("{}", e);
    }
}

impl LifecycleController {
    /// Kubeconfig context recorded by the infra layer.
    pub(crate) async fn config_context(&self) -> Result<String, LifecycleError> {
        match self
            .provisioner
            .get_kubernetes_config_context(&self.identity)
            .await
        {
            Ok(Some(context)) => Ok(context),
            Ok(None) => Err(LifecycleError::MissingContext),
            Err(e) => {
                debug!("Config context lookup for {} failed: {}", self.identity, e);
                Err(LifecycleError::MissingContext)
            }
        }
    }
}
