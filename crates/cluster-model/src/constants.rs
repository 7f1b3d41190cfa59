//! Fixed names and defaults shared across the workspace.

/// Domain suffix of the managed container registry.
pub const AZURE_CR_DOMAIN: &str = "azurecr.io";

/// Default upper bound of the worker node pool autoscaler.
pub const MAX_WORKER_NODES: u32 = 3;

/// Default registry the service images are pulled from.
pub const DEFAULT_REGISTRY_PATH: &str = "mcr.microsoft.com";

/// Default image name prefix inside the registry.
pub const DEFAULT_IMAGE_PREFIX: &str = "farmai/terravibes/";

/// Default image tag.
pub const DEFAULT_IMAGE_TAG: &str = "prod";

/// Default log level forwarded to the in-cluster services.
pub const DEFAULT_SERVICE_LOG_LEVEL: &str = "DEBUG";

/// File (inside the config directory) holding the last known service URL.
pub const REMOTE_SERVICE_URL_PATH_FILE: &str = "remote_service_url";

/// File (inside the config directory) holding the cluster kubeconfig.
pub const KUBECONFIG_FILE: &str = "kubeconfig";

/// Directory (inside the config directory) holding local Terraform state.
pub const TERRAFORM_STATE_DIR: &str = "terraform_state";

/// Blob container receiving user uploads.
pub const USERFILE_CONTAINER_NAME: &str = "userfiles";

/// Virtual directory for uploaded ONNX models.
pub const ONNX_SUBDIR: &str = "onnx_resources";

/// Namespace holding service secrets.
pub const SECRET_NAMESPACE: &str = "default";

/// Prefix of the Terraform workspace scoped to one cluster identity.
pub const WORKSPACE_PREFIX: &str = "aks-remote";

/// External tools every workflow depends on.
pub const REQUIRED_TOOLS: [&str; 4] = ["az", "terraform", "kubectl", "kubelogin"];

/// Documentation for stopping, starting or restarting an AKS cluster.
pub const START_STOP_DOCS_URL: &str =
    "https://learn.microsoft.com/en-us/azure/aks/start-stop-cluster";
