//! Persisted service endpoint
//!
//! The only state that survives between invocations: a plain-text file
//! whose whole content is the service URL.

use crate::error::ModelError;
use std::path::{Path, PathBuf};

/// Last known service URL, stored at a fixed path.
#[derive(Debug, Clone)]
pub struct PersistedEndpoint {
    path: PathBuf,
}

impl PersistedEndpoint {
    /// Endpoint file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strip stray quoting and surrounding whitespace from a discovered URL.
    pub fn normalize(url: &str) -> String {
        url.replace('"', "").trim().to_string()
    }

    /// Write `url` (normalized) as the whole file content; returns what was written.
    pub fn store(&self, url: &str) -> Result<String, ModelError> {
        let normalized = Self::normalize(url);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &normalized)?;
        Ok(normalized)
    }

    /// Read the stored URL; `None` when the file is missing or empty.
    pub fn load(&self) -> Result<Option<String>, ModelError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ModelError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_strips_quotes_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = PersistedEndpoint::new(dir.path().join("remote_service_url"));

        let written = endpoint.store("\"https://vibes.eastus.cloudapp.azure.com\"").unwrap();
        assert_eq!(written, "https://vibes.eastus.cloudapp.azure.com");
        assert_eq!(
            endpoint.load().unwrap().as_deref(),
            Some("https://vibes.eastus.cloudapp.azure.com")
        );

        let raw = std::fs::read_to_string(endpoint.path()).unwrap();
        assert!(!raw.contains('"'));
        assert!(!raw.ends_with('\n'));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = PersistedEndpoint::new(dir.path().join("absent"));
        assert!(endpoint.load().unwrap().is_none());
    }
}
