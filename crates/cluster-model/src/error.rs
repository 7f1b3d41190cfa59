//! Model-level errors

use thiserror::Error;

/// Errors raised while validating or decoding model values
#[derive(Debug, Error)]
pub enum ModelError {
    /// A layer did not produce an output a later layer consumes
    #[error("layer '{layer}' is missing required output '{key}'")]
    MissingOutput {
        /// Layer that was expected to produce the key
        layer: String,
        /// Output key
        key: String,
    },

    /// A lifecycle transition not allowed by the state machine
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        /// Current phase
        from: String,
        /// Requested phase
        to: String,
    },

    /// Registry path does not belong to the managed registry domain
    #[error("registry '{0}' is not a managed registry")]
    UnmanagedRegistry(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
