//! Argo CD cluster registration operator

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use argocd_cluster_register::capi::Cluster;
use argocd_cluster_register::config::Settings;
use argocd_cluster_register::controller::{error_policy, reconcile, Context};

/// Register Cluster API clusters with Argo CD as they come and go
#[derive(Parser, Debug)]
#[command(name = "argocd-cluster-register", version, about, long_about = None)]
struct Cli {
    /// IAM role ARN to embed in registration secrets for EKS clusters
    #[arg(long, env = "ROLE_ARN")]
    role_arn: Option<String>,

    /// Comma-separated Argo CD project names to track cluster membership in
    #[arg(long, env = "PROJECT", default_value = "")]
    project: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::new(cli.role_arn, &cli.project);

    tracing::info!(
        projects = ?settings.projects,
        role_arn_configured = settings.role_arn.is_some(),
        "starting cluster registration controller"
    );

    let client = Client::try_default().await?;
    let ctx = Arc::new(Context::new(client.clone(), settings));

    // Watch clusters in every namespace; each one reconciles independently.
    let clusters: Api<Cluster> = Api::all(client);

    Controller::new(clusters, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(?action, "reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("cluster registration controller shutting down");
    Ok(())
}
