//! `ace` -- command-line client for the ACE platform.
//!
//! Progress lines go to stdout; logs go to stderr, filtered by
//! `RUST_LOG` (default `ace_cli=info,ace_cluster=info`). Connection
//! settings are read from the environment (see
//! [`ClientConfig`](ace_cluster::config::ClientConfig)) and may be
//! overridden with `--api-url` / `--nats-url`.

use ace_cli::commands::{self, Cli};
use ace_cluster::config::ClientConfig;
use ace_cluster::factory::Factory;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ace_cli=info,ace_cluster=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => cli.client_config(config),
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };
    let factory = Factory::new(config);

    if let Err(e) = commands::run(cli.command, &factory).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
