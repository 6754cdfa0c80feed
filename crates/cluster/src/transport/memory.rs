//! In-process progress transport backed by per-subject
//! `tokio::sync::broadcast` channels.
//!
//! [`MemoryTransport`] plays both roles: the CLI side subscribes through
//! [`ProgressTransport`], and a fake control plane publishes with
//! [`publish`](MemoryTransport::publish). It is designed to be shared via
//! `Arc<MemoryTransport>`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;

use super::{ProgressTransport, Subscription, TransportError};

/// Default buffer capacity per subject.
const DEFAULT_CAPACITY: usize = 1024;

type Subjects = Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>;

/// In-process subject-keyed fan-out broker.
///
/// A subject exists while it has subscribers; the last subscription to
/// go away removes it.
pub struct MemoryTransport {
    subjects: Arc<Subjects>,
    capacity: usize,
    active: Arc<AtomicUsize>,
}

impl MemoryTransport {
    /// Create a broker with a specific per-subject capacity.
    ///
    /// When a subject's buffer is full, slow subscribers observe a
    /// receive error for the dropped messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            subjects: Arc::new(Mutex::new(HashMap::new())),
            capacity,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish `payload` to every current subscriber of `subject`.
    ///
    /// Returns the number of subscribers that will see the message.
    /// Without subscribers the message is silently dropped.
    pub fn publish(&self, subject: &str, payload: impl Into<Vec<u8>>) -> usize {
        let subjects = lock(&self.subjects);
        match subjects.get(subject) {
            Some(sender) => sender.send(payload.into()).unwrap_or(0),
            None => 0,
        }
    }

    /// Close `subject`. Subscribers drain what is buffered, then see the
    /// end of their stream.
    pub fn close(&self, subject: &str) {
        lock(&self.subjects).remove(subject);
    }

    /// Number of subscriptions that have not been released yet.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

fn lock(subjects: &Subjects) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Vec<u8>>>> {
    subjects
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl ProgressTransport for MemoryTransport {
    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError> {
        let receiver = lock(&self.subjects)
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        let listener = Listener::new(
            subject,
            receiver,
            Arc::clone(&self.subjects),
            Arc::clone(&self.active),
        );

        // The receiver exists before we return, so the subscription is live.
        let messages = futures::stream::unfold(listener, |mut listener| async move {
            let item = listener.recv().await?;
            Some((item, listener))
        })
        .boxed();

        Ok(Subscription::new(subject, messages))
    }
}

/// One subscriber's end of a subject. Counts as active until dropped,
/// and removes the subject once no receivers are left.
struct Listener {
    subject: String,
    receiver: Option<broadcast::Receiver<Vec<u8>>>,
    subjects: Arc<Subjects>,
    active: Arc<AtomicUsize>,
}

impl Listener {
    fn new(
        subject: &str,
        receiver: broadcast::Receiver<Vec<u8>>,
        subjects: Arc<Subjects>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            subject: subject.to_string(),
            receiver: Some(receiver),
            subjects,
            active,
        }
    }

    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(payload) => Some(Ok(payload)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Some(Err(
                TransportError::Receive(format!("subscriber lagged, {skipped} messages dropped")),
            )),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        // Release the receiver first so it no longer counts below.
        drop(self.receiver.take());

        let mut subjects = lock(&self.subjects);
        if subjects
            .get(&self.subject)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            subjects.remove(&self.subject);
        }
        drop(subjects);

        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_after_subscribe_is_received() {
        let transport = MemoryTransport::default();
        let mut sub = transport.subscribe("ace.progress.a").await.unwrap();

        assert_eq!(transport.publish("ace.progress.a", b"one".to_vec()), 1);

        let payload = sub.next().await.unwrap().unwrap();
        assert_eq!(payload, b"one");
    }

    #[tokio::test]
    async fn subjects_are_isolated() {
        let transport = MemoryTransport::default();
        let _a = transport.subscribe("ace.progress.a").await.unwrap();

        assert_eq!(transport.publish("ace.progress.b", b"stray".to_vec()), 0);
    }

    #[tokio::test]
    async fn close_ends_stream_after_buffered_messages() {
        let transport = MemoryTransport::default();
        let mut sub = transport.subscribe("ace.progress.a").await.unwrap();

        transport.publish("ace.progress.a", b"last".to_vec());
        transport.close("ace.progress.a");

        assert_eq!(sub.next().await.unwrap().unwrap(), b"last");
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_subscription_releases_it() {
        let transport = MemoryTransport::default();
        let sub = transport.subscribe("ace.progress.a").await.unwrap();
        assert_eq!(transport.active_subscriptions(), 1);

        drop(sub);
        assert_eq!(transport.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_sees_receive_error() {
        let transport = MemoryTransport::new(1);
        let mut sub = transport.subscribe("ace.progress.a").await.unwrap();

        transport.publish("ace.progress.a", b"1".to_vec());
        transport.publish("ace.progress.a", b"2".to_vec());

        assert!(matches!(sub.next().await, Some(Err(TransportError::Receive(_)))));
        assert_eq!(sub.next().await.unwrap().unwrap(), b"2");
    }

    #[tokio::test]
    async fn released_subjects_are_forgotten() {
        let transport = MemoryTransport::default();
        for i in 0..100 {
            let sub = transport
                .subscribe(&format!("ace.progress.{i}"))
                .await
                .unwrap();
            drop(sub);
        }

        assert_eq!(transport.active_subscriptions(), 0);
        assert!(lock(&transport.subjects).is_empty());
    }

    #[tokio::test]
    async fn subject_survives_while_another_subscriber_remains() {
        let transport = MemoryTransport::default();
        let first = transport.subscribe("ace.progress.a").await.unwrap();
        let mut second = transport.subscribe("ace.progress.a").await.unwrap();

        drop(first);
        assert_eq!(transport.publish("ace.progress.a", b"still here".to_vec()), 1);
        assert_eq!(second.next().await.unwrap().unwrap(), b"still here");

        drop(second);
        assert!(lock(&transport.subjects).is_empty());
    }

    #[tokio::test]
    async fn old_subscriber_does_not_remove_a_reopened_subject() {
        let transport = MemoryTransport::default();
        let stale = transport.subscribe("ace.progress.a").await.unwrap();
        transport.close("ace.progress.a");
        let mut fresh = transport.subscribe("ace.progress.a").await.unwrap();

        drop(stale);
        assert_eq!(transport.publish("ace.progress.a", b"fresh".to_vec()), 1);
        assert_eq!(fresh.next().await.unwrap().unwrap(), b"fresh");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let transport = MemoryTransport::default();
        assert_eq!(transport.publish("ace.progress.orphan", b"x".to_vec()), 0);
    }
}
