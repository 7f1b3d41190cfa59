//! Kubernetes cluster client
//!
//! Talks to the provisioned cluster through the kubeconfig written to the
//! config directory: discovers the public service URL from the ingress and
//! manages the secrets the services read. Every operation is keyed by the
//! kubeconfig context the infra layer recorded.

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod cluster_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeClusterClient;
pub use cluster_trait::ClusterClientTrait;
pub use error::ClusterClientError;
#[cfg(feature = "test-util")]
pub use mock::MockClusterClient;
