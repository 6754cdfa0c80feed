//! Completion and cancellation signals between the orchestrator and the
//! progress subscriber.
//!
//! [`Synchronizer::new`] returns both halves. The orchestrator keeps the
//! [`Synchronizer`] (sole cancel authority, completion waiter); the
//! subscriber task owns the [`SubscriberSignals`].
//!
//! Completion rides on a `oneshot` channel whose sender is consumed by
//! [`SubscriberSignals::complete`], so it can fire at most once.
//! Cancellation is a [`CancellationToken`]; cancelling twice is a no-op,
//! which makes a dispatch failure racing a terminal message harmless.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why the progress subscriber stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberExit {
    /// A terminal message arrived. `failed` mirrors its error flag.
    Terminal { failed: bool },
    /// The orchestrator cancelled the subscriber.
    Cancelled,
    /// The transport ended the subscription.
    TransportClosed,
    /// The transport reported a receive error.
    TransportError(String),
    /// The subscriber task went away without reporting.
    Aborted,
}

/// The completion wait ran out before the subscriber reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("subscriber did not finish within {}s", .0.as_secs())]
pub struct WaitTimedOut(pub Duration);

/// Orchestrator half.
#[derive(Debug)]
pub struct Synchronizer {
    cancel: CancellationToken,
    done: oneshot::Receiver<SubscriberExit>,
    finished: Option<SubscriberExit>,
}

/// Subscriber half.
#[derive(Debug)]
pub struct SubscriberSignals {
    cancel: CancellationToken,
    done: oneshot::Sender<SubscriberExit>,
}

impl Synchronizer {
    pub fn new() -> (Self, SubscriberSignals) {
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = oneshot::channel();

        let signals = SubscriberSignals {
            cancel: cancel.child_token(),
            done: done_tx,
        };
        let sync = Self {
            cancel,
            done: done_rx,
            finished: None,
        };
        (sync, signals)
    }

    /// Ask the subscriber to stop. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait up to `timeout` for the subscriber's completion signal.
    ///
    /// Once the signal has been received, later calls return the same
    /// exit immediately.
    pub async fn wait(&mut self, timeout: Duration) -> Result<SubscriberExit, WaitTimedOut> {
        if let Some(exit) = &self.finished {
            return Ok(exit.clone());
        }

        let exit = match tokio::time::timeout(timeout, &mut self.done).await {
            Ok(Ok(exit)) => exit,
            // Sender dropped without a report: the task panicked or was aborted.
            Ok(Err(_)) => SubscriberExit::Aborted,
            Err(_) => return Err(WaitTimedOut(timeout)),
        };

        self.finished = Some(exit.clone());
        Ok(exit)
    }

    /// Cancel, then give the subscriber `grace` to release its
    /// subscription and report.
    pub async fn cancel_and_wait(&mut self, grace: Duration) -> Result<SubscriberExit, WaitTimedOut> {
        self.cancel();
        self.wait(grace).await
    }
}

impl SubscriberSignals {
    /// Resolves once the orchestrator cancels.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Fire the completion signal. Consumes the signals, so it happens once.
    pub fn complete(self, exit: SubscriberExit) {
        // The orchestrator may have stopped listening after a timeout.
        let _ = self.done.send(exit);
    }
}
