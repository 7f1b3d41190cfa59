//! aks-remote cluster model
//!
//! Shared value types for the remote cluster lifecycle: the immutable
//! cluster identity, the fixed provisioning topology and the outputs each
//! layer hands to the next, registry credentials, quota arithmetic, the
//! lifecycle state machine and the persisted service endpoint.

pub mod constants;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod identity;
pub mod layer;
pub mod lifecycle;
pub mod quota;

pub use credentials::*;
pub use endpoint::PersistedEndpoint;
pub use error::ModelError;
pub use identity::*;
pub use layer::*;
pub use lifecycle::*;
pub use quota::*;
