//! Registry credentials and the infrastructure state backend

use crate::constants::AZURE_CR_DOMAIN;
use crate::error::ModelError;
use std::fmt;

/// Registry path plus optional credentials.
///
/// On a fresh create against a managed registry, missing credentials are
/// inferred from the registry before any resource is touched.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CredentialBundle {
    /// Registry host (and optional path)
    pub registry_path: String,
    /// Registry user name
    pub registry_username: Option<String>,
    /// Registry password
    pub registry_password: Option<String>,
}

impl CredentialBundle {
    /// Create a bundle; empty strings count as absent.
    pub fn new(
        registry_path: impl Into<String>,
        registry_username: Option<String>,
        registry_password: Option<String>,
    ) -> Self {
        Self {
            registry_path: registry_path.into(),
            registry_username: registry_username.filter(|u| !u.is_empty()),
            registry_password: registry_password.filter(|p| !p.is_empty()),
        }
    }

    /// Whether the registry lives in the managed registry domain.
    pub fn is_managed_registry(&self) -> bool {
        !self.registry_path.is_empty() && self.registry_path.ends_with(AZURE_CR_DOMAIN)
    }

    /// Whether both user name and password are present.
    pub fn is_complete(&self) -> bool {
        self.registry_username.is_some() && self.registry_password.is_some()
    }

    /// Whether credentials must be inferred before provisioning.
    pub fn needs_inference(&self, is_update: bool) -> bool {
        !is_update && self.is_managed_registry() && !self.is_complete()
    }

    /// Registry resource name: the first label of `<name>.azurecr.io`.
    pub fn managed_registry_name(&self) -> Result<&str, ModelError> {
        if !self.is_managed_registry() {
            return Err(ModelError::UnmanagedRegistry(self.registry_path.clone()));
        }
        self.registry_path
            .split('.')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ModelError::UnmanagedRegistry(self.registry_path.clone()))
    }

    /// Complete the bundle with inferred credentials.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.registry_username = Some(username);
        self.registry_password = Some(password);
        self
    }

    /// User name or empty string
    pub fn username(&self) -> &str {
        self.registry_username.as_deref().unwrap_or_default()
    }

    /// Password or empty string
    pub fn password(&self) -> &str {
        self.registry_password.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("registry_path", &self.registry_path)
            .field("registry_username", &self.registry_username)
            .field(
                "registry_password",
                &self.registry_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Location of the durable state backend.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BackendStorage {
    /// Storage account name
    pub storage_name: String,
    /// Blob container holding state files
    pub container_name: String,
    /// Storage account access key
    pub access_key: String,
}

impl BackendStorage {
    /// A backend is only usable when every field is present.
    pub fn is_complete(&self) -> bool {
        !self.storage_name.is_empty()
            && !self.container_name.is_empty()
            && !self.access_key.is_empty()
    }
}

impl fmt::Debug for BackendStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendStorage")
            .field("storage_name", &self.storage_name)
            .field("container_name", &self.container_name)
            .field("access_key", &"<redacted>")
            .finish()
    }
}
