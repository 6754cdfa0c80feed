//! NATS progress transport.
//!
//! Core NATS subscriptions are registered asynchronously on the server,
//! so a plain `subscribe` can return before the interest is visible to
//! other connections. [`NatsTransport::subscribe`] closes that gap by
//! publishing a marker on the subject and waiting until the marker comes
//! back through the new subscription. Connections opened with
//! `no_echo` never see their own marker and cannot confirm.

use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use super::{ProgressTransport, Subscription, TransportError};

/// Payload of the confirmation marker. Never valid progress JSON.
pub const SUBSCRIPTION_MARKER: &[u8] = b"\0ace-subscription-marker";

/// Progress transport backed by a NATS connection.
pub struct NatsTransport {
    client: Client,
    confirm_timeout: Duration,
}

impl NatsTransport {
    /// Connect to the NATS server at `url`.
    ///
    /// * `name`    - connection name shown in server monitoring.
    /// * `timeout` - bound on both the connect and each subscribe
    ///   confirmation.
    pub async fn connect(url: &str, name: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = ConnectOptions::new()
            .name(name)
            .connection_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| {
                TransportError::Connection(format!("Failed to connect to NATS at {url}: {e}"))
            })?;

        tracing::info!(url = %url, name = %name, "Connected to NATS");

        Ok(Self::from_client(client, timeout))
    }

    /// Wrap an already-connected client.
    pub fn from_client(client: Client, confirm_timeout: Duration) -> Self {
        Self {
            client,
            confirm_timeout,
        }
    }
}

#[async_trait]
impl ProgressTransport for NatsTransport {
    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError> {
        let subscribe_error = |reason: String| TransportError::Subscribe {
            subject: subject.to_string(),
            reason,
        };

        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;
        let mut payloads = subscriber.map(|message| message.payload.to_vec()).boxed();

        self.client
            .publish(subject.to_string(), SUBSCRIPTION_MARKER.into())
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        let early = await_marker(&mut payloads, self.confirm_timeout)
            .await
            .map_err(|e| subscribe_error(e.to_string()))?;

        tracing::debug!(subject = %subject, early = early.len(), "NATS subscription confirmed");

        Ok(Subscription::new(subject, without_markers(early, payloads)))
    }
}

/// Why a subscription could not be confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
enum ConfirmError {
    #[error("subscription closed during confirmation")]
    Closed,
    #[error("not confirmed within {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Read `payloads` until the marker comes back.
///
/// Returns whatever arrived ahead of the marker, in order.
async fn await_marker<S>(
    payloads: &mut S,
    timeout: Duration,
) -> Result<Vec<Vec<u8>>, ConfirmError>
where
    S: Stream<Item = Vec<u8>> + Unpin,
{
    let mut early = Vec::new();
    let confirmed = tokio::time::timeout(timeout, async {
        while let Some(payload) = payloads.next().await {
            if payload == SUBSCRIPTION_MARKER {
                return true;
            }
            early.push(payload);
        }
        false
    })
    .await;

    match confirmed {
        Ok(true) => Ok(early),
        Ok(false) => Err(ConfirmError::Closed),
        Err(_) => Err(ConfirmError::TimedOut(timeout)),
    }
}

/// Replay `early`, then follow `live` with any further markers removed.
fn without_markers<S>(
    early: Vec<Vec<u8>>,
    live: S,
) -> BoxStream<'static, Result<Vec<u8>, TransportError>>
where
    S: Stream<Item = Vec<u8>> + Send + 'static,
{
    let live = live.filter(|payload| futures::future::ready(payload != SUBSCRIPTION_MARKER));
    futures::stream::iter(early).chain(live).map(Ok).boxed()
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn payloads(items: &[&[u8]]) -> Vec<Vec<u8>> {
        items.iter().map(|item| item.to_vec()).collect()
    }

    #[tokio::test]
    async fn marker_confirms_and_keeps_what_overtook_it() {
        let mut incoming = stream::iter(payloads(&[b"early", SUBSCRIPTION_MARKER, b"late"]));

        let early = await_marker(&mut incoming, Duration::from_secs(1)).await.unwrap();

        assert_eq!(early, payloads(&[b"early"]));
        assert_eq!(incoming.next().await, Some(b"late".to_vec()));
    }

    #[tokio::test]
    async fn stream_ending_before_marker_is_an_error() {
        let mut incoming = stream::iter(payloads(&[b"early"]));

        let result = await_marker(&mut incoming, Duration::from_secs(1)).await;
        assert_eq!(result, Err(ConfirmError::Closed));
    }

    #[tokio::test]
    async fn missing_marker_times_out() {
        let mut incoming = stream::pending::<Vec<u8>>();

        let result = await_marker(&mut incoming, Duration::from_millis(20)).await;
        assert_eq!(result, Err(ConfirmError::TimedOut(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn early_payloads_come_first_and_markers_never_surface() {
        let live = stream::iter(payloads(&[b"one", SUBSCRIPTION_MARKER, b"two"]));

        let received: Vec<_> = without_markers(payloads(&[b"zero"]), live)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(received, payloads(&[b"zero", b"one", b"two"]));
    }
}
