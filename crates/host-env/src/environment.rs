//! Host environment
//!
//! Owns the local configuration directory layout and tool discovery. The
//! config directory doubles as an extra tool directory: helper binaries such
//! as `kubelogin` are expected there when they are not on `PATH`.

use crate::error::HostError;
use crate::runner::ToolRunner;
use cluster_model::PersistedEndpoint;
use cluster_model::constants::{
    KUBECONFIG_FILE, REMOTE_SERVICE_URL_PATH_FILE, TERRAFORM_STATE_DIR,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application directory name under the platform config directory
const APP_DIR: &str = "aks-remote";
/// Default location of the Terraform modules under the config directory
const TERRAFORM_MODULES_DIR: &str = "terraform_modules";
/// Kernel release marker of WSL hosts
const WSL_RELEASE_FILE: &str = "/proc/sys/kernel/osrelease";

/// Local host context for one invocation.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    config_dir: PathBuf,
    terraform_modules: PathBuf,
    path_var: Option<OsString>,
}

impl HostEnvironment {
    /// Build from explicit directories, capturing the current `PATH`.
    pub fn new(config_dir: impl Into<PathBuf>, terraform_modules: Option<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let terraform_modules =
            terraform_modules.unwrap_or_else(|| config_dir.join(TERRAFORM_MODULES_DIR));
        Self {
            config_dir,
            terraform_modules,
            path_var: std::env::var_os("PATH"),
        }
    }

    /// Resolve the config directory (override or platform default) and make sure it exists.
    pub fn discover(
        config_dir: Option<PathBuf>,
        terraform_modules: Option<PathBuf>,
    ) -> Result<Self, HostError> {
        let dir = match config_dir {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or(HostError::NoConfigDir)?
                .join(APP_DIR),
        };
        std::fs::create_dir_all(&dir)?;
        std::fs::create_dir_all(dir.join(TERRAFORM_STATE_DIR))?;
        debug!("Using config directory {}", dir.display());
        Ok(Self::new(dir, terraform_modules))
    }

    /// Replace the captured `PATH` (used by tests and for explicit scoping).
    #[must_use]
    pub fn with_path_var(mut self, path_var: Option<OsString>) -> Self {
        self.path_var = path_var;
        self
    }

    /// Configuration directory
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// File inside the configuration directory
    pub fn config_file(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    /// Kubeconfig consumed by the cluster client
    pub fn kubeconfig_path(&self) -> PathBuf {
        self.config_file(KUBECONFIG_FILE)
    }

    /// Persisted service endpoint
    pub fn endpoint(&self) -> PersistedEndpoint {
        PersistedEndpoint::new(self.config_file(REMOTE_SERVICE_URL_PATH_FILE))
    }

    /// Directory holding local Terraform state
    pub fn terraform_state_dir(&self) -> PathBuf {
        self.config_file(TERRAFORM_STATE_DIR)
    }

    /// Root of the Terraform modules, one subdirectory per layer
    pub fn terraform_modules_dir(&self) -> &Path {
        &self.terraform_modules
    }

    /// Extra directories searched before `PATH`
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        vec![self.config_dir.clone()]
    }

    fn path_dirs(&self) -> Vec<PathBuf> {
        self.path_var
            .as_ref()
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default()
    }

    /// Locate `tool` in the extra search directories, then `PATH`.
    pub fn locate(&self, tool: &str) -> Option<PathBuf> {
        locate_in(tool, self.search_dirs().iter().chain(self.path_dirs().iter()))
    }

    /// Verify every tool can be found; lists all missing ones at once.
    pub fn check_dependencies(&self, tools: &[&str]) -> Result<(), HostError> {
        let missing: Vec<String> = tools
            .iter()
            .filter(|tool| self.locate(tool).is_none())
            .map(|tool| (*tool).to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(HostError::MissingTools {
            missing,
            config_dir: self.config_dir.display().to_string(),
        })
    }

    /// Runner scoped to this environment's search directories
    pub fn runner(&self) -> ToolRunner {
        ToolRunner::new(self.search_dirs(), self.path_var.clone())
    }

    /// Whether the host is a WSL distribution.
    pub fn is_wsl() -> bool {
        std::fs::read_to_string(WSL_RELEASE_FILE)
            .map(|release| release.to_lowercase().contains("microsoft"))
            .unwrap_or(false)
    }

    /// Whether `path` lives on a mounted Windows drive.
    pub fn is_windows_mount(path: &Path) -> bool {
        path.starts_with("/mnt/")
    }

    /// WSL with the cloud CLI taken from the Windows side: its account
    /// context does not match the Linux side and discovery misbehaves.
    pub fn is_restricted_context(&self) -> bool {
        Self::is_wsl()
            && self
                .locate("az")
                .is_some_and(|az| Self::is_windows_mount(&az))
    }

    /// Warning text when interactive `kubectl` use will not find `kubelogin`.
    pub fn path_warning(&self) -> Option<String> {
        let path_dirs = self.path_dirs();
        let config_on_path = path_dirs.iter().any(|d| d == &self.config_dir);
        let kubelogin_on_path = self
            .locate("kubelogin")
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .is_some_and(|dir| path_dirs.contains(&dir));
        if config_on_path || kubelogin_on_path {
            return None;
        }
        Some(format!(
            "{dir} not in PATH. Interacting with the cluster via kubectl will not work. \
             Please add {dir} to your PATH.",
            dir = self.config_dir.display()
        ))
    }

    /// Remove the cached kubeconfig and every local Terraform state entry.
    ///
    /// Best effort: individual failures are logged and the sweep continues.
    pub fn clear_local_state(&self) {
        let kubeconfig = self.kubeconfig_path();
        if kubeconfig.is_file() {
            if let Err(e) = std::fs::remove_file(&kubeconfig) {
                warn!("Failed to remove {}: {}", kubeconfig.display(), e);
            }
        }

        let state_dir = self.terraform_state_dir();
        let Ok(entries) = std::fs::read_dir(&state_dir) else {
            debug!("No local state directory at {}", state_dir.display());
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = result {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

/// First `dir/tool` (or `dir/tool.exe` on Windows) that is a file.
pub(crate) fn locate_in<'a>(
    tool: &str,
    dirs: impl IntoIterator<Item = &'a PathBuf>,
) -> Option<PathBuf> {
    dirs.into_iter().find_map(|dir| {
        let candidate = dir.join(tool);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{tool}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn config_dir_is_searched_before_path() {
        let config = tempfile::tempdir().unwrap();
        let on_path = tempfile::tempdir().unwrap();
        touch(&config.path().join("kubelogin"));
        touch(&on_path.path().join("kubelogin"));
        touch(&on_path.path().join("az"));

        let env = HostEnvironment::new(config.path(), None)
            .with_path_var(Some(on_path.path().as_os_str().to_owned()));

        assert_eq!(
            env.locate("kubelogin").unwrap(),
            config.path().join("kubelogin")
        );
        assert_eq!(env.locate("az").unwrap(), on_path.path().join("az"));
        assert!(env.locate("terraform").is_none());
    }

    #[test]
    fn missing_tools_are_all_reported() {
        let config = tempfile::tempdir().unwrap();
        touch(&config.path().join("az"));
        let env = HostEnvironment::new(config.path(), None).with_path_var(None);

        let err = env
            .check_dependencies(&["az", "terraform", "kubectl"])
            .unwrap_err();
        match err {
            HostError::MissingTools { missing, .. } => {
                assert_eq!(missing, vec!["terraform".to_string(), "kubectl".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn path_warning_when_config_dir_not_on_path() {
        let config = tempfile::tempdir().unwrap();
        let env = HostEnvironment::new(config.path(), None).with_path_var(None);
        assert!(env.path_warning().is_some());

        let env = env.with_path_var(Some(config.path().as_os_str().to_owned()));
        assert!(env.path_warning().is_none());
    }

    #[test]
    fn clear_local_state_removes_kubeconfig_and_state() {
        let config = tempfile::tempdir().unwrap();
        let env = HostEnvironment::discover(Some(config.path().to_path_buf()), None).unwrap();
        touch(&env.kubeconfig_path());
        let layer_dir = env.terraform_state_dir().join("infra");
        std::fs::create_dir_all(&layer_dir).unwrap();
        touch(&layer_dir.join("terraform.tfstate"));
        touch(&env.terraform_state_dir().join("stray.lock"));
        env.endpoint().store("https://kept").unwrap();

        env.clear_local_state();

        assert!(!env.kubeconfig_path().exists());
        assert_eq!(std::fs::read_dir(env.terraform_state_dir()).unwrap().count(), 0);
        assert_eq!(env.endpoint().load().unwrap().as_deref(), Some("https://kept"));
    }

    #[test]
    fn windows_mounts_are_detected() {
        assert!(HostEnvironment::is_windows_mount(Path::new(
            "/mnt/c/Program Files/az"
        )));
        assert!(!HostEnvironment::is_windows_mount(Path::new("/usr/bin/az")));
    }
}
