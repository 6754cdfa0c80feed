//! REST client for the ACE cluster-management API.
//!
//! Only the removal endpoint is wrapped. The call returns as soon as the
//! control plane has queued the job; progress arrives separately on the
//! progress transport.

use ace_core::cluster::RemovalRequest;

/// Path of the removal endpoint, relative to the API base URL.
pub const REMOVE_CLUSTER_PATH: &str = "/api/v1/clusters/remove";

/// HTTP client for the cluster-management API.
pub struct ClusterApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the cluster-management REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ClusterApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The target resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API returned a non-2xx status code other than 404.
    #[error("ACE API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ClusterApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `https://api.appscode.com`.
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Queue a cluster removal.
    ///
    /// Sends `POST /api/v1/clusters/remove` with the options and the
    /// correlation token as `responseId`. Does not wait for the removal
    /// to finish.
    pub async fn remove_cluster(&self, request: &RemovalRequest) -> Result<(), ClusterApiError> {
        let response = self
            .client
            .post(format!("{}{REMOVE_CLUSTER_PATH}", self.api_url))
            .json(request)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    // ---- private helpers ----

    /// Map non-success statuses to [`ClusterApiError`], keeping the body
    /// text for diagnostics.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClusterApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClusterApiError::NotFound(body));
        }
        Err(ClusterApiError::ApiError {
            status: status.as_u16(),
            body,
        })
    }
}
