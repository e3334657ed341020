//! Persistence Service: writes agent step state asynchronously, never
//! blocking the request path.
//!
//! Subscribes to `Topic::AgentStepComplete`, pushes `(thread_id, step,
//! state, created_at)` into a bounded in-memory queue, and a single
//! background worker drains it into a [`CheckpointStore`]. On backend
//! failure the worker retries with exponential backoff up to a configured
//! cap; when the queue is full, the oldest entry is dropped to make room
//! and `Topic::PersistenceOverflow` is published with running counts.

#![warn(missing_docs)]

pub mod store;

pub use store::{CheckpointStore, SqliteCheckpointStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skill_reactor::{Reactor, Topic};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One agent-step checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// The conversation/thread this step belongs to.
    pub thread_id: String,
    /// Monotonic step index within the thread.
    pub step: i64,
    /// Opaque agent state, serialized as JSON.
    pub state: serde_json::Value,
    /// When this checkpoint was enqueued.
    pub created_at: DateTime<Utc>,
}

/// Tunables for the Persistence Service.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Maximum records held in the in-memory queue before shedding.
    pub queue_capacity: usize,
    /// Maximum write attempts before a record is given up on.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub base_retry_delay: Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            max_retries: 5,
            base_retry_delay: Duration::from_millis(100),
        }
    }
}

struct Queue {
    items: Mutex<VecDeque<CheckpointRecord>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

impl Queue {
    fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    async fn push(&self, record: CheckpointRecord, reactor: &Reactor) {
        let mut items = self.items.lock().await;
        if items.len() >= self.capacity {
            items.pop_front();
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(dropped_total = dropped, "persistence queue full, dropped oldest checkpoint");
            reactor
                .publish(
                    Topic::PersistenceOverflow,
                    serde_json::json!({"dropped_total": dropped, "queue_len": items.len()}),
                    None,
                )
                .await;
        }
        items.push_back(record);
        self.notify.notify_one();
    }

    async fn pop(&self) -> CheckpointRecord {
        loop {
            {
                let mut items = self.items.lock().await;
                if let Some(record) = items.pop_front() {
                    return record;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Runs the bounded queue and its draining worker. Dropping this value
/// aborts both background tasks.
pub struct PersistenceService {
    queue: Arc<Queue>,
    subscriber: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl PersistenceService {
    /// Subscribes to `Topic::AgentStepComplete` on `reactor` and starts the
    /// draining worker against `store`.
    pub fn spawn(store: Arc<dyn CheckpointStore>, reactor: Reactor, config: PersistenceConfig) -> Self {
        let queue = Arc::new(Queue::new(config.queue_capacity));

        let subscriber = {
            let queue = queue.clone();
            let reactor = reactor.clone();
            tokio::spawn(async move {
                let mut rx = reactor.subscribe(Topic::AgentStepComplete, 0).await;
                while let Some(event) = rx.recv().await {
                    match serde_json::from_value::<CheckpointRecord>(event.payload) {
                        Ok(record) => queue.push(record, &reactor).await,
                        Err(e) => warn!(error = %e, "malformed agent.step_complete payload, dropping"),
                    }
                }
            })
        };

        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                loop {
                    let record = queue.pop().await;
                    write_with_retry(&*store, record, &config).await;
                }
            })
        };

        Self { queue, subscriber, worker }
    }

    /// Number of checkpoints dropped by overflow shedding so far.
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for PersistenceService {
    fn drop(&mut self) {
        self.subscriber.abort();
        self.worker.abort();
    }
}

async fn write_with_retry(store: &dyn CheckpointStore, record: CheckpointRecord, config: &PersistenceConfig) {
    let mut attempt = 0;
    loop {
        match store.save(&record).await {
            Ok(()) => {
                return;
            }
            Err(e) => {
                attempt += 1;
                if attempt >= config.max_retries {
                    error!(
                        thread_id = %record.thread_id,
                        step = record.step,
                        attempts = attempt,
                        error = %e,
                        "giving up on checkpoint after exhausting retries"
                    );
                    return;
                }
                let delay = config.base_retry_delay * 2u32.pow(attempt - 1);
                warn!(thread_id = %record.thread_id, step = record.step, attempt, delay_ms = delay.as_millis(), error = %e, "checkpoint write failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FlakyStore {
        fail_times: AtomicUsize,
        saved: Mutex<Vec<CheckpointRecord>>,
    }

    #[async_trait]
    impl CheckpointStore for FlakyStore {
        fn backend_name(&self) -> &'static str {
            "flaky"
        }
        async fn setup(&self) -> Result<(), StoreError> {
            Ok(())
        }
        async fn save(&self, record: &CheckpointRecord) -> Result<(), StoreError> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Database("transient".to_string()));
            }
            self.saved.lock().await.push(record.clone());
            Ok(())
        }
        async fn latest(&self, _thread_id: &str, _limit: i64) -> Result<Vec<CheckpointRecord>, StoreError> {
            Ok(self.saved.lock().await.clone())
        }
    }

    fn record(step: i64) -> CheckpointRecord {
        CheckpointRecord {
            thread_id: "t1".to_string(),
            step,
            state: serde_json::json!({"n": step}),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let store = FlakyStore {
            fail_times: AtomicUsize::new(2),
            saved: Mutex::new(vec![]),
        };
        let config = PersistenceConfig {
            base_retry_delay: Duration::from_millis(1),
            ..Default::default()
        };
        write_with_retry(&store, record(1), &config).await;
        assert_eq!(store.saved.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_publishes() {
        let reactor = Reactor::new(8, skill_reactor::BackpressurePolicy::Block);
        let mut overflow_rx = reactor.subscribe(Topic::PersistenceOverflow, 0).await;
        let queue = Queue::new(1);

        queue.push(record(1), &reactor).await;
        queue.push(record(2), &reactor).await;

        let event = overflow_rx.recv().await.unwrap();
        assert_eq!(event.payload["dropped_total"], serde_json::json!(1));

        let remaining = queue.pop().await;
        assert_eq!(remaining.step, 2);
    }
}
