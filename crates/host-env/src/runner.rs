//! Scoped tool execution
//!
//! Every external tool runs with a child-only `PATH` made of the caller's
//! `PATH` followed by the extra search directories. The process environment
//! of aks-remote itself is never modified.

use crate::environment::locate_in;
use crate::error::ToolError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A single tool call.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    tool: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    /// Number of leading arguments safe to log
    loggable_args: usize,
}

impl ToolInvocation {
    /// Call `tool` with no arguments
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            loggable_args: 3,
            ..Default::default()
        }
    }

    /// Append arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the child only
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Tool name
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Full argument list
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Short description without secret-bearing arguments
    pub fn summary(&self) -> String {
        self.args
            .iter()
            .take(self.loggable_args)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs tools with a per-invocation search path.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    search_dirs: Vec<PathBuf>,
    path_var: Option<OsString>,
}

impl ToolRunner {
    /// Runner that appends `search_dirs` to `path_var` for its children.
    pub fn new(search_dirs: Vec<PathBuf>, path_var: Option<OsString>) -> Self {
        Self {
            search_dirs,
            path_var,
        }
    }

    fn path_dirs(&self) -> Vec<PathBuf> {
        self.path_var
            .as_ref()
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// `PATH` handed to children: caller's `PATH`, then the extra directories.
    pub fn child_path(&self) -> OsString {
        let mut dirs = self.path_dirs();
        for dir in &self.search_dirs {
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        std::env::join_paths(dirs).unwrap_or_default()
    }

    /// Absolute path of `tool`, extra directories first.
    pub fn resolve(&self, tool: &str) -> Result<PathBuf, ToolError> {
        locate_in(tool, self.search_dirs.iter().chain(self.path_dirs().iter()))
            .ok_or_else(|| ToolError::NotFound(tool.to_string()))
    }

    /// Run and capture output regardless of exit status.
    pub async fn output(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let binary = self.resolve(invocation.tool())?;
        debug!("Running {} {}", invocation.tool(), invocation.summary());

        let mut command = Command::new(&binary);
        command
            .args(invocation.arguments())
            .env("PATH", self.child_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &invocation.envs {
            command.env(key, value);
        }

        let output = command.output().await.map_err(|source| ToolError::Spawn {
            tool: invocation.tool().to_string(),
            source,
        })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and fail on a non-zero exit; returns stdout.
    pub async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        let output = self.output(invocation).await?;
        if !output.success() {
            return Err(ToolError::Failed {
                tool: invocation.tool().to_string(),
                command: invocation.summary(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
