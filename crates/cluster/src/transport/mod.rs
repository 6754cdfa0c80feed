//! Progress transports.
//!
//! A [`ProgressTransport`] opens a [`Subscription`] on a subject and
//! only returns once the subscription is live, so a job dispatched
//! afterwards cannot publish into the void.
//!
//! - [`nats::NatsTransport`] -- the production transport.
//! - [`memory::MemoryTransport`] -- in-process broker for tests and
//!   offline runs.

pub mod memory;
pub mod nats;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;

pub use memory::MemoryTransport;
pub use nats::NatsTransport;

/// Errors raised by a progress transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the transport server.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The subscription could not be established or confirmed.
    #[error("Subscribe failed on {subject}: {reason}")]
    Subscribe { subject: String, reason: String },

    /// A receive error on an established subscription.
    #[error("Receive error: {0}")]
    Receive(String),
}

#[async_trait]
pub trait ProgressTransport: Send + Sync {
    /// Subscribe to `subject`.
    ///
    /// Must not return `Ok` before the transport guarantees that messages
    /// published to `subject` from now on reach the subscription.
    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError>;
}

/// A live subscription on one subject.
///
/// Owns the underlying transport resource. Dropping it unsubscribes, so
/// the resource is released exactly once on every exit path.
pub struct Subscription {
    subject: String,
    messages: BoxStream<'static, Result<Vec<u8>, TransportError>>,
}

impl Subscription {
    pub fn new(
        subject: impl Into<String>,
        messages: BoxStream<'static, Result<Vec<u8>, TransportError>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            messages,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Next raw payload. `None` means the transport closed the subscription.
    pub async fn next(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.messages.next().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
