//! Subscriber hub: broadcasts versioned snapshot-then-delta frames to every
//! live WebSocket subscriber. Built on [`kedge_events::EventBus`] rather
//! than a hand-rolled mutex-guarded list of sockets — broadcast already
//! gives every subscriber its own queue and never blocks the sender on a
//! slow reader.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{Duration, sleep};

use kedge_events::{EventBus, EventStream};

use crate::json_diff::json_diff;

/// How long `tick` sleeps between broadcasts when at least one subscriber
/// is connected.
pub const BROADCAST_INTERVAL: Duration = Duration::from_secs(1);

/// How long `tick` backs off when no subscriber is connected.
pub const IDLE_BACKOFF: Duration = Duration::from_secs(20);

/// A delta frame broadcast to subscribers on each tick. The initial frame a
/// subscriber receives on join has its own distinct shape; see
/// [`JoinFrame`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastFrame {
    /// Monotonically increasing version, bumped on every join and tick.
    pub version: u64,
    /// Always `true`; present so clients can tell a tick frame apart from a
    /// join frame, which carries no `delta` key at all.
    pub delta: bool,
    /// A JSON-Patch array describing the change since the last frame.
    pub body: Value,
}

/// The one-time frame a subscriber receives immediately on join: a full
/// `sync_stats()` snapshot tagged with the subscriber's own id, not a delta.
/// Carries no `delta` key, unlike [`BroadcastFrame`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinFrame {
    /// Monotonically increasing version, bumped on every join and tick.
    pub version: u64,
    /// Identifier assigned to this subscriber, stable for its connection.
    pub id: String,
    /// Full `sync_stats()` snapshot at join time.
    pub body: Value,
}

/// Broadcasts [`BroadcastFrame`]s to every live subscriber and tracks the
/// snapshot needed to compute the next delta.
pub struct SubscriberHub {
    bus: EventBus<BroadcastFrame>,
    sync_ver: AtomicU64,
    next_subscriber_id: AtomicU64,
    prev_stats: Mutex<Option<Value>>,
}

impl SubscriberHub {
    /// Construct an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: EventBus::new(),
            sync_ver: AtomicU64::new(0),
            next_subscriber_id: AtomicU64::new(1),
            prev_stats: Mutex::new(None),
        }
    }

    /// Current `sync_ver`.
    #[must_use]
    pub fn sync_ver(&self) -> u64 {
        self.sync_ver.load(Ordering::SeqCst)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Register a new subscriber: bump `sync_ver`, populate `curr_stats`
    /// from `compute_snapshot` if it hasn't been computed yet, and return
    /// the initial join frame plus a stream for every later delta. The
    /// caller is responsible for sending the join frame to the new
    /// subscriber before forwarding the stream.
    pub fn join(&self, compute_snapshot: impl FnOnce() -> Value) -> (JoinFrame, EventStream<BroadcastFrame>) {
        let version = self.sync_ver.fetch_add(1, Ordering::SeqCst) + 1;
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        let stream = self.bus.subscribe(None);
        let mut prev_stats = self.prev_stats.lock().unwrap();
        let snapshot = prev_stats.get_or_insert_with(compute_snapshot).clone();
        (
            JoinFrame {
                version,
                id: id.to_string(),
                body: snapshot,
            },
            stream,
        )
    }

    /// If no subscribers are connected, back off for [`IDLE_BACKOFF`] and
    /// return. Otherwise sleep [`BROADCAST_INTERVAL`], bump `sync_ver`,
    /// compute the new snapshot, diff it against the last one, and
    /// broadcast the delta.
    pub async fn tick(&self, compute_snapshot: impl FnOnce() -> Value) {
        if self.subscriber_count() == 0 {
            sleep(IDLE_BACKOFF).await;
            return;
        }
        sleep(BROADCAST_INTERVAL).await;
        let version = self.sync_ver.fetch_add(1, Ordering::SeqCst) + 1;
        let curr_stats = compute_snapshot();
        let delta = {
            let prev = self.prev_stats.lock().unwrap();
            let prev_value = prev.clone().unwrap_or(Value::Null);
            json_diff(&prev_value, &curr_stats)
        };
        *self.prev_stats.lock().unwrap() = Some(curr_stats);
        self.bus.publish(BroadcastFrame {
            version,
            delta: true,
            body: Value::Array(delta),
        });
    }
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_populates_snapshot_once_and_bumps_version() {
        let hub = SubscriberHub::new();
        let (frame, _stream) = hub.join(|| json!({"stats": {}, "torrents": []}));
        assert_eq!(frame.version, 1);
        assert_eq!(frame.id, "1");
        assert_eq!(hub.sync_ver(), 1);

        let (frame2, _stream2) = hub.join(|| panic!("snapshot already populated, should not recompute"));
        assert_eq!(frame2.version, 2);
        assert_eq!(frame2.id, "2");
        assert_eq!(frame2.body, frame.body);
    }

    #[test]
    fn join_frame_serializes_without_a_delta_key() {
        let hub = SubscriberHub::new();
        let (frame, _stream) = hub.join(|| json!({"a": 1}));
        let encoded = serde_json::to_value(&frame).unwrap();
        assert!(encoded.as_object().unwrap().get("delta").is_none());
        assert_eq!(encoded["id"], json!("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_backs_off_when_no_subscribers() {
        let hub = SubscriberHub::new();
        let start = tokio::time::Instant::now();
        hub.tick(|| json!({})).await;
        assert!(tokio::time::Instant::now() - start >= IDLE_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_broadcasts_empty_delta_when_state_unchanged() {
        let hub = SubscriberHub::new();
        let (_frame, mut stream) = hub.join(|| json!({"a": 1}));
        hub.tick(|| json!({"a": 1})).await;
        let next = stream.next().await.unwrap();
        assert!(next.payload.delta);
        assert_eq!(next.payload.body, json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_ver_strictly_increases_across_broadcasts() {
        let hub = SubscriberHub::new();
        let (frame, mut stream) = hub.join(|| json!({"a": 1}));
        let mut last = frame.version;
        for next_val in [2, 3, 4] {
            hub.tick(move || json!({"a": next_val})).await;
            let frame = stream.next().await.unwrap();
            assert!(frame.payload.version > last);
            last = frame.payload.version;
        }
    }
}
