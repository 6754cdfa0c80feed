//! `ace cluster ...` commands.

use std::sync::Arc;

use ace_cluster::factory::Factory;
use ace_cluster::orchestrator::{RemovalOrchestrator, RemovalOutcome};
use ace_cluster::printer::StdoutPrinter;
use ace_cluster::sync::SubscriberExit;
use ace_core::cluster::RemovalOptions;
use anyhow::Context;
use clap::{ArgAction, Args, Subcommand};

#[derive(Debug, Subcommand)]
pub enum ClusterAction {
    /// Remove a cluster from ACE platform
    Remove(RemoveArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RemoveArgs {
    /// Name of the cluster to remove
    #[arg(long)]
    pub name: String,

    /// Specify whether to remove FluxCD or not
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub remove_fluxcd: bool,

    /// Specify whether to remove license server or not
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub remove_license_server: bool,
}

impl RemoveArgs {
    pub fn options(&self) -> RemovalOptions {
        RemovalOptions::new(self.name.clone())
            .with_fluxcd(self.remove_fluxcd)
            .with_license_server(self.remove_license_server)
    }
}

pub async fn run(action: ClusterAction, factory: &Factory) -> anyhow::Result<()> {
    match action {
        ClusterAction::Remove(args) => {
            let remover = factory
                .remover(Arc::new(StdoutPrinter))
                .await
                .context("failed to connect to the progress transport")?;
            remove(&remover, &args).await
        }
    }
}

/// Remove a cluster and report the outcome.
///
/// A cluster that no longer exists is a success; the orchestrator has
/// already told the user.
pub async fn remove(remover: &RemovalOrchestrator, args: &RemoveArgs) -> anyhow::Result<()> {
    tracing::info!(cluster = %args.name, "Removing cluster");

    let outcome = remover
        .remove(args.options())
        .await
        .context("failed to remove cluster. Reason")?;

    match outcome {
        RemovalOutcome::AlreadyRemoved => {}
        RemovalOutcome::Completed { token, exit } => match exit {
            SubscriberExit::Terminal { failed: false } => {
                tracing::info!(cluster = %args.name, token = %token, "Cluster removal finished");
            }
            SubscriberExit::Terminal { failed: true } => {
                tracing::warn!(
                    cluster = %args.name,
                    token = %token,
                    "Cluster removal reported a failure, see the steps above",
                );
            }
            other => {
                tracing::warn!(
                    cluster = %args.name,
                    token = %token,
                    exit = ?other,
                    "Lost track of removal progress, the job keeps running on the control plane",
                );
            }
        },
        RemovalOutcome::ProgressTimedOut { token, after } => {
            tracing::warn!(
                cluster = %args.name,
                token = %token,
                timeout_secs = after.as_secs(),
                "Removal was accepted but did not finish in time, the job keeps running on the control plane",
            );
        }
    }

    Ok(())
}
