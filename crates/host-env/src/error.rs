//! Host and tool errors

use thiserror::Error;

/// Errors probing the host
#[derive(Debug, Error)]
pub enum HostError {
    /// One or more required binaries could not be found
    #[error("required tools not found: {}. Install them or place them in {config_dir}", missing.join(", "))]
    MissingTools {
        /// Binaries that were not found
        missing: Vec<String>,
        /// Config directory also searched
        config_dir: String,
    },

    /// No configuration directory could be determined
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors running an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    /// The binary is not on any search directory
    #[error("tool '{0}' not found")]
    NotFound(String),

    /// The process could not be spawned
    #[error("failed to run '{tool}': {source}")]
    Spawn {
        /// Tool name
        tool: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The process exited unsuccessfully; stderr is kept verbatim
    #[error("'{tool} {command}' failed with exit code {code:?}: {stderr}")]
    Failed {
        /// Tool name
        tool: String,
        /// Subcommand summary (first arguments)
        command: String,
        /// Exit code, if any
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },
}

impl ToolError {
    /// Captured stderr of a failed run, empty otherwise
    pub fn stderr(&self) -> &str {
        match self {
            ToolError::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }
}
