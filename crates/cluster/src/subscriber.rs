//! Progress subscriber.
//!
//! [`ProgressSubscriber::start`] subscribes to the progress subject of a
//! correlation token and returns only once the subscription is
//! confirmed. The receive loop then runs on its own task until a
//! terminal message, cancellation, or the end of the transport stream,
//! and reports the reason through [`SubscriberSignals::complete`].

use std::sync::Arc;

use ace_core::progress::parse_progress;
use ace_core::subjects::progress_subject;
use ace_core::types::CorrelationToken;
use tokio::task::JoinHandle;

use crate::printer::StepPrinter;
use crate::sync::{SubscriberExit, SubscriberSignals};
use crate::transport::{ProgressTransport, Subscription, TransportError};

/// A running progress subscriber.
#[derive(Debug)]
pub struct ProgressSubscriber {
    subject: String,
    task: JoinHandle<()>,
}

impl ProgressSubscriber {
    /// Subscribe to the progress of `token` and spawn the receive loop.
    ///
    /// Returns `Err` if the subscription cannot be established; nothing
    /// is spawned in that case and `signals` is dropped.
    pub async fn start(
        transport: &dyn ProgressTransport,
        token: &CorrelationToken,
        printer: Arc<dyn StepPrinter>,
        signals: SubscriberSignals,
    ) -> Result<Self, TransportError> {
        let subject = progress_subject(token);
        let subscription = transport.subscribe(&subject).await?;

        tracing::debug!(token = %token, subject = %subject, "Progress subscription active");

        let task = tokio::spawn(async move {
            let exit = receive_loop(subscription, printer.as_ref(), &signals).await;
            tracing::debug!(?exit, "Progress subscriber finished");
            signals.complete(exit);
        });

        Ok(Self { subject, task })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether the receive loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Receive and print progress until the stream ends for any reason.
///
/// The subscription is consumed and released before this returns.
pub async fn receive_loop(
    mut subscription: Subscription,
    printer: &dyn StepPrinter,
    signals: &SubscriberSignals,
) -> SubscriberExit {
    let exit = loop {
        tokio::select! {
            biased;
            _ = signals.cancelled() => {
                tracing::debug!(subject = %subscription.subject(), "Progress subscriber cancelled");
                break SubscriberExit::Cancelled;
            }
            next = subscription.next() => match next {
                Some(Ok(payload)) => {
                    if let Some(exit) = handle_payload(&payload, subscription.subject(), printer) {
                        break exit;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        subject = %subscription.subject(),
                        error = %e,
                        "Progress stream failed, no further steps will be shown",
                    );
                    break SubscriberExit::TransportError(e.to_string());
                }
                None => {
                    tracing::warn!(
                        subject = %subscription.subject(),
                        "Progress stream closed before the job finished",
                    );
                    break SubscriberExit::TransportClosed;
                }
            }
        }
    };

    drop(subscription);
    exit
}

/// Decode and print one payload. Returns the exit reason for terminal
/// messages.
fn handle_payload(payload: &[u8], subject: &str, printer: &dyn StepPrinter) -> Option<SubscriberExit> {
    let message = match parse_progress(payload) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                subject = %subject,
                error = %e,
                raw_message = %String::from_utf8_lossy(payload),
                "Failed to parse progress message",
            );
            return None;
        }
    };

    if message.error {
        tracing::warn!(subject = %subject, step = %message.text, "Job reported an error");
    }
    printer.print_step(&message);

    message.terminal.then_some(SubscriberExit::Terminal {
        failed: message.error,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ace_core::progress::ProgressMessage;

    use super::*;
    use crate::printer::BufferPrinter;
    use crate::sync::Synchronizer;
    use crate::transport::MemoryTransport;

    const WAIT: Duration = Duration::from_secs(2);

    async fn start(
        transport: &MemoryTransport,
        token: &CorrelationToken,
    ) -> (ProgressSubscriber, Synchronizer, BufferPrinter) {
        let printer = BufferPrinter::new();
        let (sync, signals) = Synchronizer::new();
        let subscriber = ProgressSubscriber::start(transport, token, Arc::new(printer.clone()), signals)
            .await
            .expect("memory subscribe never fails");
        (subscriber, sync, printer)
    }

    #[tokio::test]
    async fn prints_steps_until_terminal() {
        let transport = MemoryTransport::default();
        let token = CorrelationToken::from_raw("T1").unwrap();
        let (subscriber, mut sync, printer) = start(&transport, &token).await;

        transport.publish(subscriber.subject(), ProgressMessage::step("one").to_bytes());
        transport.publish(subscriber.subject(), ProgressMessage::last("two").to_bytes());
        transport.publish(subscriber.subject(), ProgressMessage::step("after").to_bytes());

        assert_eq!(
            sync.wait(WAIT).await,
            Ok(SubscriberExit::Terminal { failed: false })
        );
        assert_eq!(printer.lines(), vec!["one", "two"]);
        assert_eq!(transport.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn malformed_message_is_skipped() {
        let transport = MemoryTransport::default();
        let token = CorrelationToken::from_raw("T2").unwrap();
        let (subscriber, mut sync, printer) = start(&transport, &token).await;

        transport.publish(subscriber.subject(), b"{not json".to_vec());
        transport.publish(subscriber.subject(), ProgressMessage::last("done").to_bytes());

        sync.wait(WAIT).await.unwrap();
        assert_eq!(printer.lines(), vec!["done"]);
    }

    #[tokio::test]
    async fn terminal_error_is_reported_as_failed() {
        let transport = MemoryTransport::default();
        let token = CorrelationToken::from_raw("T3").unwrap();
        let (subscriber, mut sync, _printer) = start(&transport, &token).await;

        transport.publish(subscriber.subject(), ProgressMessage::failed("boom").to_bytes());

        assert_eq!(
            sync.wait(WAIT).await,
            Ok(SubscriberExit::Terminal { failed: true })
        );
    }

    #[tokio::test]
    async fn cancellation_stops_loop_without_terminal() {
        let transport = MemoryTransport::default();
        let token = CorrelationToken::from_raw("T4").unwrap();
        let (subscriber, mut sync, printer) = start(&transport, &token).await;

        assert_eq!(sync.cancel_and_wait(WAIT).await, Ok(SubscriberExit::Cancelled));
        assert!(printer.lines().is_empty());
        assert_eq!(transport.active_subscriptions(), 0);

        // Give the runtime a moment to retire the task.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(subscriber.is_finished());
    }

    #[tokio::test]
    async fn transport_closure_ends_loop() {
        let transport = MemoryTransport::default();
        let token = CorrelationToken::from_raw("T5").unwrap();
        let (subscriber, mut sync, printer) = start(&transport, &token).await;

        transport.publish(subscriber.subject(), ProgressMessage::step("partial").to_bytes());
        transport.close(subscriber.subject());

        assert_eq!(sync.wait(WAIT).await, Ok(SubscriberExit::TransportClosed));
        assert_eq!(printer.lines(), vec!["partial"]);
        assert_eq!(transport.active_subscriptions(), 0);
    }
}
