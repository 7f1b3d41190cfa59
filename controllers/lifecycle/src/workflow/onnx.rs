//! ONNX model upload
//!
//! Models land in the user-file container under `onnx_resources/<file name>`,
//! replacing any earlier upload of the same name.

use super::report;
use crate::controller::LifecycleController;
use crate::error::LifecycleError;
use cluster_model::constants::{ONNX_SUBDIR, USERFILE_CONTAINER_NAME};
use std::path::Path;
use tracing::{debug, info};

/// Blob name of an uploaded model.
pub fn onnx_destination(model_path: &Path) -> Result<String, LifecycleError> {
    let file_name = model_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            LifecycleError::Precondition(format!(
                "Model path {} has no file name",
                model_path.display()
            ))
        })?;
    Ok(format!("{ONNX_SUBDIR}/{file_name}"))
}

impl LifecycleController {
    /// Upload `model_path` to the cluster's user-file storage.
    pub async fn add_onnx(&self, model_path: &Path) -> bool {
        report(self.try_add_onnx(model_path).await)
    }

    async fn try_add_onnx(&self, model_path: &Path) -> Result<(), LifecycleError> {
        if !model_path.is_file() {
            return Err(LifecycleError::Precondition(format!(
                "Model file {} does not exist",
                model_path.display()
            )));
        }
        let destination = onnx_destination(model_path)?;

        if !self.azure.cluster_exists(&self.identity).await? {
            return Err(LifecycleError::ClusterMissing);
        }

        info!("Refreshing Azure credentials...");
        self.azure
            .ensure_session()
            .await
            .map_err(LifecycleError::auth)?;

        let storage_account = self
            .provisioner
            .get_storage_account_name(&self.identity)
            .await?
            .ok_or(LifecycleError::NoConnectionString)?;
        debug!("User files live in storage account {}", storage_account);

        info!("Getting storage connection string...");
        let connection_string = self
            .azure
            .storage_connection_string(&self.identity, &storage_account)
            .await?
            .ok_or(LifecycleError::NoConnectionString)?;

        info!("Uploading files...");
        self.azure
            .upload_file(
                model_path,
                &connection_string,
                USERFILE_CONTAINER_NAME,
                &destination,
            )
            .await?;
        info!("Uploaded {} as {}", model_path.display(), destination);
        Ok(())
    }
}
