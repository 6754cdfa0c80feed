//! Explicit construction of the remote collaborators.
//!
//! [`Factory`] is built from a [`ClientConfig`] and passed to whoever
//! needs an API client or a progress transport; there is no
//! process-wide client registry.

use std::sync::Arc;

use crate::api::ClusterApi;
use crate::config::ClientConfig;
use crate::orchestrator::{OrchestratorConfig, RemovalOrchestrator};
use crate::printer::StepPrinter;
use crate::transport::{NatsTransport, TransportError};

#[derive(Debug, Clone)]
pub struct Factory {
    config: ClientConfig,
}

impl Factory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// HTTP client for the cluster-management API.
    pub fn api(&self) -> ClusterApi {
        ClusterApi::new(self.config.api_url.clone())
    }

    /// Open a NATS connection for progress streaming.
    pub async fn transport(&self) -> Result<NatsTransport, TransportError> {
        NatsTransport::connect(
            &self.config.nats_url,
            &self.config.connection_name,
            self.config.connect_timeout,
        )
        .await
    }

    /// Wire an orchestrator against the live API and NATS.
    pub async fn remover(
        &self,
        printer: Arc<dyn StepPrinter>,
    ) -> Result<RemovalOrchestrator, TransportError> {
        let transport = self.transport().await?;
        Ok(RemovalOrchestrator::new(
            Arc::new(self.api()),
            Arc::new(transport),
            printer,
        )
        .with_config(OrchestratorConfig::from(&self.config)))
    }
}
