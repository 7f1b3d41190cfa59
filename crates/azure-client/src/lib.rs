//! Azure CLI client
//!
//! Wraps the `az` command line for everything the cluster lifecycle needs
//! from the cloud control plane: the session gate (login, resource
//! providers, core quota), identity lookups, the Terraform state backend,
//! registry credentials, blob uploads, and the resource-group inspection and
//! deletion primitives used by teardown.
//!
//! The workflows only talk to [`AzureClientTrait`]; tests use
//! [`MockAzureClient`] (feature `test-util`).

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod azure_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use azure_trait::AzureClientTrait;
pub use client::AzureCliClient;
pub use error::AzureError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::{MockAzureClient, Upload, resource};
