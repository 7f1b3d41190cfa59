//! Terraform provisioner
//!
//! Runs the fixed provisioning topology (resource group, state backend,
//! infra, Kubernetes cluster, services) one Terraform module per layer. Each
//! layer takes the outputs of earlier layers as explicit inputs and returns
//! its own outputs as a [`LayerOutput`](cluster_model::LayerOutput).
//!
//! Layers that keep remote state run inside a workspace scoped to one
//! cluster identity; callers acquire it before the first layer and release
//! it on every exit path.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod provisioner_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::TerraformClient;
pub use error::TerraformError;
pub use models::*;
pub use provisioner_trait::ProvisionerTrait;
#[cfg(feature = "test-util")]
pub use mock::MockProvisioner;
