//! Job dispatch seam.
//!
//! [`JobDispatcher`] hands a removal job to the control plane and
//! returns once it is accepted. The orchestrator only depends on this
//! trait, so tests can stand in a fake control plane.

use ace_core::cluster::RemovalRequest;
use async_trait::async_trait;

use crate::api::{ClusterApi, ClusterApiError};

/// Outcome classification for a dispatch attempt.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The target no longer exists, so there is nothing to remove.
    #[error("target already removed")]
    AlreadyDone,

    /// Any other transport or backend failure.
    #[error("{0}")]
    Backend(String),
}

#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Submit `request` for asynchronous execution.
    async fn dispatch(&self, request: RemovalRequest) -> Result<(), DispatchError>;
}

#[async_trait]
impl JobDispatcher for ClusterApi {
    async fn dispatch(&self, request: RemovalRequest) -> Result<(), DispatchError> {
        match self.remove_cluster(&request).await {
            Ok(()) => {
                tracing::info!(
                    cluster = %request.cluster_name(),
                    token = %request.token(),
                    "Removal job accepted",
                );
                Ok(())
            }
            Err(ClusterApiError::NotFound(body)) => {
                tracing::debug!(cluster = %request.cluster_name(), body = %body, "Cluster not found");
                Err(DispatchError::AlreadyDone)
            }
            Err(e) => Err(DispatchError::Backend(e.to_string())),
        }
    }
}
