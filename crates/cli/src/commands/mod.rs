//! Command-line surface.

pub mod cluster;

use ace_cluster::config::ClientConfig;
use ace_cluster::factory::Factory;
use clap::{Parser, Subcommand};

use self::cluster::ClusterAction;

#[derive(Debug, Parser)]
#[command(name = "ace")]
#[command(about = "Command-line client for the ACE platform", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Cluster-management API base URL (overrides ACE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Progress transport URL (overrides ACE_NATS_URL)
    #[arg(long, global = true)]
    pub nats_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cluster management commands
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the environment config.
    pub fn client_config(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(url) = &self.nats_url {
            config.nats_url = url.clone();
        }
        config
    }
}

/// Run the parsed command.
pub async fn run(command: Commands, factory: &Factory) -> anyhow::Result<()> {
    match command {
        Commands::Cluster { action } => cluster::run(action, factory).await,
    }
}
