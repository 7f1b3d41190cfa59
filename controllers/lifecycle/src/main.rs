//! aks-remote
//!
//! Operator CLI for one remote AKS cluster:
//! - setup / update: provision or refresh every layer, with rollback on failure
//! - status: discover and persist the public service URL
//! - add-secret / delete-secret: manage secrets read by the services
//! - add-onnx: upload a model to the cluster's user-file storage
//! - destroy: tear down remote resources and local state

mod cli;
mod controller;
mod error;
mod prompt;
mod workflow;

#[cfg(test)]
mod test_utils;

use azure_client::AzureCliClient;
use clap::Parser;
use cli::{Action, Cli};
use cluster_client::KubeClusterClient;
use controller::{LifecycleController, preflight};
use host_env::HostEnvironment;
use prompt::TerminalConfirm;
use std::process::ExitCode;
use std::sync::Arc;
use terraform_client::TerraformClient;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // kube picks the process-wide provider; a second install is harmless
    let _ = rustls::crypto::ring::default_provider().install_default();

    let action = match Action::parse(&cli.action) {
        Ok(action) => action,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, action).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, action: Action) -> anyhow::Result<bool> {
    let host = HostEnvironment::discover(cli.config_dir.clone(), cli.terraform_modules.clone())?;
    if let Err(e) = preflight(&host) {
        error!("{}", e);
        return Ok(false);
    }

    let identity = cli.identity();
    debug!("Running {} for {}", action, identity);

    let azure = Arc::new(AzureCliClient::new(host.runner()));
    let provisioner = Arc::new(TerraformClient::new(&host, azure.clone()));
    let cluster = Arc::new(KubeClusterClient::new(&host));

    let controller = LifecycleController::new(
        identity,
        host,
        azure,
        provisioner,
        cluster,
        Arc::new(TerminalConfirm),
    );
    Ok(controller.dispatch(action, &cli.action_args()).await)
}
