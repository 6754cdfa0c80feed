//! Cluster removal orchestration.
//!
//! [`RemovalOrchestrator`] runs one removal through
//! `Idle -> TokenIssued -> SubscriberStarted -> Dispatched -> Completed`:
//!
//! 1. generate a fresh [`CorrelationToken`];
//! 2. start the [`ProgressSubscriber`] and wait until its subscription is
//!    live, so no progress published right after dispatch is lost;
//! 3. dispatch the job. "Already removed" cancels the subscriber and
//!    counts as success; any other failure cancels the subscriber and is
//!    returned;
//! 4. wait, bounded by the progress timeout, for the subscriber to see
//!    the terminal message or the end of the stream.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ace_core::cluster::{RemovalOptions, RemovalRequest};
use ace_core::error::CoreError;
use ace_core::types::CorrelationToken;

use crate::config::ClientConfig;
use crate::dispatcher::{DispatchError, JobDispatcher};
use crate::printer::StepPrinter;
use crate::subscriber::ProgressSubscriber;
use crate::sync::{SubscriberExit, Synchronizer, WaitTimedOut};
use crate::transport::{ProgressTransport, TransportError};

/// Printed when the target cluster no longer exists.
pub const ALREADY_REMOVED_MESSAGE: &str = "Cluster has been removed already.";

// ---------------------------------------------------------------------------
// State, outcome, error
// ---------------------------------------------------------------------------

/// Lifecycle of a single removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalState {
    Idle,
    TokenIssued,
    SubscriberStarted,
    Dispatched,
    Completed,
    AlreadyRemoved,
    CancelledOnDispatchFailure,
    ProgressTimedOut,
}

impl RemovalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TokenIssued => "token_issued",
            Self::SubscriberStarted => "subscriber_started",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::AlreadyRemoved => "already_removed",
            Self::CancelledOnDispatchFailure => "cancelled_on_dispatch_failure",
            Self::ProgressTimedOut => "progress_timed_out",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::AlreadyRemoved
                | Self::CancelledOnDispatchFailure
                | Self::ProgressTimedOut
        )
    }
}

impl fmt::Display for RemovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful result of a removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The job was accepted and the progress stream ended.
    Completed {
        token: CorrelationToken,
        exit: SubscriberExit,
    },
    /// The cluster did not exist.
    AlreadyRemoved,
    /// The job was accepted but did not finish within the progress timeout.
    ProgressTimedOut {
        token: CorrelationToken,
        after: Duration,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RemovalError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Progress could not be followed, so nothing was dispatched.
    #[error("failed to subscribe to removal progress: {0}")]
    Subscribe(#[source] TransportError),

    #[error(transparent)]
    Dispatch(DispatchError),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Bound on waiting for the terminal progress message.
    pub progress_timeout: Duration,
    /// How long to wait for the subscriber to stop after cancelling it.
    pub cancel_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for OrchestratorConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            progress_timeout: config.progress_timeout,
            cancel_grace: config.cancel_grace,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct RemovalOrchestrator {
    dispatcher: Arc<dyn JobDispatcher>,
    transport: Arc<dyn ProgressTransport>,
    printer: Arc<dyn StepPrinter>,
    config: OrchestratorConfig,
}

impl RemovalOrchestrator {
    pub fn new(
        dispatcher: Arc<dyn JobDispatcher>,
        transport: Arc<dyn ProgressTransport>,
        printer: Arc<dyn StepPrinter>,
    ) -> Self {
        Self {
            dispatcher,
            transport,
            printer,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Remove a cluster, printing its progress as it happens.
    pub async fn remove(&self, options: RemovalOptions) -> Result<RemovalOutcome, RemovalError> {
        self.remove_with_token(options, CorrelationToken::generate())
            .await
    }

    /// Same as [`remove`](Self::remove) with a caller-supplied token.
    ///
    /// The token must be fresh: reusing one merges two progress streams.
    pub async fn remove_with_token(
        &self,
        options: RemovalOptions,
        token: CorrelationToken,
    ) -> Result<RemovalOutcome, RemovalError> {
        options.validate()?;

        let mut run = Run::new(&token, &options.name);
        run.enter(RemovalState::TokenIssued);

        let (mut sync, signals) = Synchronizer::new();
        let subscriber = ProgressSubscriber::start(
            self.transport.as_ref(),
            &token,
            Arc::clone(&self.printer),
            signals,
        )
        .await
        .map_err(|e| {
            tracing::error!(token = %token, error = %e, "Could not subscribe to removal progress");
            RemovalError::Subscribe(e)
        })?;
        run.enter(RemovalState::SubscriberStarted);

        let request = RemovalRequest::new(options, token.clone());
        match self.dispatcher.dispatch(request).await {
            Ok(()) => run.enter(RemovalState::Dispatched),
            Err(DispatchError::AlreadyDone) => {
                self.stop_subscriber(&mut sync, subscriber.subject()).await;
                run.enter(RemovalState::AlreadyRemoved);
                self.printer.print_line(ALREADY_REMOVED_MESSAGE);
                return Ok(RemovalOutcome::AlreadyRemoved);
            }
            Err(e) => {
                tracing::error!(token = %token, error = %e, "Removal dispatch failed");
                self.stop_subscriber(&mut sync, subscriber.subject()).await;
                run.enter(RemovalState::CancelledOnDispatchFailure);
                return Err(RemovalError::Dispatch(e));
            }
        }

        match sync.wait(self.config.progress_timeout).await {
            Ok(exit) => {
                run.enter(RemovalState::Completed);
                Ok(RemovalOutcome::Completed { token, exit })
            }
            Err(WaitTimedOut(after)) => {
                tracing::warn!(
                    token = %token,
                    timeout_secs = after.as_secs(),
                    "No terminal progress message before the timeout",
                );
                self.stop_subscriber(&mut sync, subscriber.subject()).await;
                run.enter(RemovalState::ProgressTimedOut);
                Ok(RemovalOutcome::ProgressTimedOut { token, after })
            }
        }
    }

    /// Cancel the subscriber and give it the grace period to release its
    /// subscription.
    async fn stop_subscriber(&self, sync: &mut Synchronizer, subject: &str) {
        match sync.cancel_and_wait(self.config.cancel_grace).await {
            Ok(exit) => tracing::debug!(subject = %subject, ?exit, "Progress subscriber stopped"),
            Err(e) => tracing::warn!(subject = %subject, error = %e, "Progress subscriber did not stop"),
        }
    }
}

/// State tracking for one removal, logged on every transition.
struct Run<'a> {
    token: &'a CorrelationToken,
    cluster: String,
    state: RemovalState,
}

impl<'a> Run<'a> {
    fn new(token: &'a CorrelationToken, cluster: &str) -> Self {
        Self {
            token,
            cluster: cluster.to_string(),
            state: RemovalState::Idle,
        }
    }

    fn enter(&mut self, next: RemovalState) {
        debug_assert!(!self.state.is_terminal(), "left terminal state {}", self.state);
        tracing::debug!(
            token = %self.token,
            cluster = %self.cluster,
            from = %self.state,
            to = %next,
            "Removal state changed",
        );
        self.state = next;
    }
}
