//! Typed, priority-ordered, bounded-queue publish/subscribe event bus.
//!
//! Every kernel component that needs to react to something another
//! component did (a file changed, a skill loaded, the persistence queue
//! overflowed) talks through here rather than holding a direct reference
//! to the producer. Delivery is per-subscriber publication order and
//! at-least-once; handler idempotence is the handler's responsibility.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Topics a producer can publish to and a subscriber can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// A file under a watched skill directory changed.
    FileChanged,
    /// A skill finished loading into `SkillContext`.
    SkillLoaded,
    /// A skill was evicted or explicitly unloaded.
    SkillUnloaded,
    /// An agent step completed (used by relationship-aware rerank to
    /// learn co-usage).
    AgentStepComplete,
    /// The Indexer published a new snapshot.
    IndexUpdated,
    /// The Persistence Service's bounded queue overflowed and dropped an
    /// entry.
    PersistenceOverflow,
}

/// One event on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing id, unique per process.
    pub id: u64,
    /// Topic this event was published to.
    pub topic: Topic,
    /// Event-specific payload.
    pub payload: serde_json::Value,
    /// The id of the event that caused this one to be published, if any.
    /// A handler that would republish with the same `origin_event_id` on
    /// the same topic must drop the republish instead, breaking
    /// feedback cycles (e.g. a reindex triggered by a reindex).
    pub origin_event_id: Option<u64>,
}

/// What happens to a new event when a topic's queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// The publisher awaits room in the queue.
    Block,
    /// The oldest queued event for this topic is dropped to make room.
    DropOldest,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        BackpressurePolicy::Block
    }
}

struct Subscriber {
    priority: i32,
    sender: mpsc::Sender<Event>,
}

/// The event bus. Cheap to clone — internally an `Arc`.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

struct Inner {
    next_id: AtomicU64,
    queue_capacity: usize,
    backpressure: BackpressurePolicy,
    subscribers: RwLock<HashMap<Topic, Vec<Subscriber>>>,
}

impl Reactor {
    /// Creates a new Reactor with the given per-subscriber queue capacity.
    pub fn new(queue_capacity: usize, backpressure: BackpressurePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                queue_capacity,
                backpressure,
                subscribers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Registers a new subscriber for `topic`. Lower `priority` values are
    /// delivered first; subscribers with equal priority preserve
    /// registration order. Returns the receiving end of the subscriber's
    /// bounded channel.
    pub async fn subscribe(&self, topic: Topic, priority: i32) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        let mut subs = self.inner.subscribers.write().await;
        let entry = subs.entry(topic).or_default();
        entry.push(Subscriber {
            priority,
            sender: tx,
        });
        entry.sort_by_key(|s| s.priority);
        rx
    }

    /// Publishes `payload` to `topic`. `origin_event_id` should be set to
    /// the id of the event that triggered this publish, when applicable,
    /// so handlers can break republish cycles.
    pub async fn publish(
        &self,
        topic: Topic,
        payload: serde_json::Value,
        origin_event_id: Option<u64>,
    ) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            topic,
            payload,
            origin_event_id,
        };

        let subs = self.inner.subscribers.read().await;
        if let Some(subscribers) = subs.get(&topic) {
            for sub in subscribers {
                match self.inner.backpressure {
                    BackpressurePolicy::Block => {
                        if sub.sender.send(event.clone()).await.is_err() {
                            debug!(topic = ?topic, "subscriber channel closed, dropping");
                        }
                    }
                    BackpressurePolicy::DropOldest => {
                        if let Err(mpsc::error::TrySendError::Full(ev)) =
                            sub.sender.try_send(event.clone())
                        {
                            warn!(topic = ?topic, event_id = ev.id, "queue full, dropping oldest delivery attempt");
                        }
                    }
                }
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_priority_order() {
        let reactor = Reactor::new(8, BackpressurePolicy::Block);
        let mut low = reactor.subscribe(Topic::FileChanged, 10).await;
        let mut high = reactor.subscribe(Topic::FileChanged, 0).await;

        reactor
            .publish(Topic::FileChanged, serde_json::json!({"path": "a.py"}), None)
            .await;

        let high_event = high.recv().await.unwrap();
        let low_event = low.recv().await.unwrap();
        assert_eq!(high_event.id, low_event.id);
    }

    #[tokio::test]
    async fn origin_event_id_round_trips() {
        let reactor = Reactor::new(4, BackpressurePolicy::Block);
        let mut rx = reactor.subscribe(Topic::IndexUpdated, 0).await;
        let first = reactor
            .publish(Topic::FileChanged, serde_json::json!({}), None)
            .await;
        reactor
            .publish(Topic::IndexUpdated, serde_json::json!({}), Some(first))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.origin_event_id, Some(first));
    }
}
