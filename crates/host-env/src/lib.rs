//! Host environment probing
//!
//! Locates the configuration directory and the external tools the
//! provisioning workflows shell out to, detects restricted hosts, and runs
//! those tools with a search path that is augmented per invocation instead
//! of mutating the process environment.

pub mod environment;
pub mod error;
pub mod runner;

pub use environment::HostEnvironment;
pub use error::{HostError, ToolError};
pub use runner::{ToolInvocation, ToolOutput, ToolRunner};
