//! Database API entry point
//!
//! Connects to the Kubernetes API server, then serves the REST API.

use std::sync::Arc;

use clap::Parser;
use database_k8s_api::config::{Cli, Command, RunArgs};
use database_k8s_api::coordinator::DatabaseCoordinator;
use database_k8s_api::rest_api::{self, AppState};
use database_k8s_api::store::KubeStore;
use database_k8s_api::{crd, telemetry, Error};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Crd => {
            print!("{}", crd::database_crd_yaml()?);
            Ok(())
        }
        Command::Run(args) => {
            let result = run(args).await;
            // Flush any remaining traces
            telemetry::shutdown_telemetry();
            Ok(result?)
        }
    }
}

async fn run(args: RunArgs) -> Result<(), Error> {
    args.validate()?;
    telemetry::init_tracing(args.log_format)?;

    info!(
        "Starting Database API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = args.coordinator_settings();

    // The store must be reachable before any request is served.
    let store = KubeStore::connect(args.kubeconfig.as_deref(), settings.call_timeout).await?;

    info!(
        "Default namespace: {}, store call timeout: {:?}",
        settings.default_namespace, settings.call_timeout
    );

    let coordinator = Arc::new(DatabaseCoordinator::new(Arc::new(store), settings));
    let state = Arc::new(AppState::new(coordinator));

    rest_api::run_server(state, args.listen_addr()).await
}
