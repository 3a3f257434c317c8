#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]
#![allow(unexpected_cfgs)]

//! Generic broadcast bus shared by every fan-out seam in the engine.
//!
//! Subscriber hubs (the WebSocket delta stream, diagnostics consumers, …) all
//! want the same shape: a sequential id per published item, a short replay
//! buffer for late joiners, and best-effort delivery that never lets a slow
//! consumer block a publisher. This crate provides that shape once, generic
//! over the payload type `T`, on top of `tokio::broadcast`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::error;

pub mod error;

pub use error::{EventBusError, EventBusResult};

/// Identifier assigned to each item published on a bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Envelope wrapping a published payload with its sequence id and emission time.
#[derive(Debug, Clone)]
pub struct EventEnvelope<T> {
    /// Monotonic identifier assigned to the wrapped payload.
    pub id: EventId,
    /// Unix epoch microseconds recorded when the envelope was produced.
    pub timestamp_us: u64,
    /// Wrapped payload.
    pub payload: T,
}

/// Generic broadcast bus built on top of `tokio::broadcast`.
///
/// Cloning a bus is cheap and shares the same channel and replay buffer; every
/// clone is just another handle onto the same fan-out point.
pub struct EventBus<T> {
    sender: Sender<EventEnvelope<T>>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope<T>>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            buffer: Arc::clone(&self.buffer),
            next_id: Arc::clone(&self.next_id),
            replay_capacity: self.replay_capacity,
        }
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new payload to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    pub fn publish(&self, payload: T) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp_us: now_us(),
            payload,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        // No receivers is not an error: a publish with nobody subscribed yet
        // (e.g. at startup) must not fail the caller.
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered items newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream<T> {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            for item in buffer.iter() {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Returns the last assigned identifier, if anything has been published.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let buffer = self.lock_buffer();
        buffer.back().map(|item| item.id)
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope<T>>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("event buffer mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Stream wrapper that yields items either from the replay backlog or from the
/// live broadcast channel.
pub struct EventStream<T> {
    backlog: VecDeque<EventEnvelope<T>>,
    receiver: Receiver<EventEnvelope<T>>,
}

impl<T: Clone> EventStream<T> {
    /// Receive the next item, respecting the replay backlog first.
    ///
    /// A lagged receiver (the subscriber fell behind the broadcast capacity)
    /// is treated as "skip forward", not as a fatal error: the next `recv`
    /// call is retried once, matching the divergence-tolerant contract of a
    /// delta-stream subscriber (it will pick up the discrepancy at the next
    /// full snapshot).
    pub async fn next(&mut self) -> Option<EventEnvelope<T>> {
        if let Some(item) = self.backlog.pop_front() {
            return Some(item);
        }

        match self.receiver.recv().await {
            Ok(item) => Some(item),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task;
    use tokio::time::timeout;

    const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn sequential_ids_and_replay() {
        let bus: EventBus<u64> = EventBus::with_capacity(16);

        let mut last_id = 0;
        for i in 0..5u64 {
            last_id = bus.publish(i);
        }
        assert_eq!(last_id, 5);

        let mut stream = bus.subscribe(Some(2));
        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(item) = stream.next().await {
                received.push(item);
            }
        }

        assert_eq!(received.len(), 3);
        assert_eq!(received.first().unwrap().id, 3);
        assert_eq!(received.last().unwrap().id, 5);
    }

    #[tokio::test]
    async fn load_test_does_not_stall_publishers() {
        let bus: Arc<EventBus<u64>> = Arc::new(EventBus::with_capacity(512));
        let mut stream = bus.subscribe(None);

        let publisher = {
            let bus = Arc::clone(&bus);
            task::spawn(async move {
                for i in 0..500u64 {
                    let bus = Arc::clone(&bus);
                    timeout(PUBLISH_TIMEOUT, async move {
                        let _ = bus.publish(i);
                    })
                    .await
                    .expect("publish timed out");
                }
            })
        };

        let consumer = task::spawn(async move {
            let mut ids = HashSet::new();
            while ids.len() < 500 {
                if let Some(item) = stream.next().await {
                    ids.insert(item.id);
                }
            }
            ids
        });

        publisher.await.expect("publisher task panicked");
        let ids = consumer.await.expect("consumer task panicked");
        assert_eq!(ids.len(), 500);
    }

    #[tokio::test]
    async fn last_event_id_reflects_recent_publish() {
        let bus: EventBus<u64> = EventBus::with_capacity(2);
        assert!(bus.last_event_id().is_none(), "no events published yet");
        let published = bus.publish(7);
        assert_eq!(bus.last_event_id(), Some(published));
    }

    #[tokio::test]
    async fn sync_ver_is_strictly_increasing() {
        let bus: EventBus<u64> = EventBus::with_capacity(8);
        let mut stream = bus.subscribe(None);
        for i in 0..4u64 {
            bus.publish(i);
        }
        let mut last = 0;
        for _ in 0..4 {
            let item = timeout(PUBLISH_TIMEOUT, stream.next())
                .await
                .expect("stream stalled")
                .expect("stream closed");
            assert!(item.id > last, "sync_ver must strictly increase");
            last = item.id;
        }
    }

    #[tokio::test]
    async fn stream_returns_none_after_sender_dropped() {
        let mut stream = {
            let bus: EventBus<u64> = EventBus::with_capacity(1);
            let stream = bus.subscribe(None);
            drop(bus);
            stream
        };
        assert!(
            stream.next().await.is_none(),
            "closing the sender should end the stream"
        );
    }
}
