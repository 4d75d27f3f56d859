//! Live update bus
//!
//! Fan-out of change notifications to connected observers. Delivery is best
//! effort: an observer whose send fails or stalls past the send timeout is
//! dropped from the set and never retried.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::metrics;

pub type ObserverId = u64;

/// Upper bound on a single observer send
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client able to receive text frames
#[async_trait]
pub trait Observer: Send + Sync {
    async fn send(&self, payload: &str) -> anyhow::Result<()>;
}

/// Notification pushed to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// A project was created, changed or deleted
    Update {
        #[serde(rename = "projectId")]
        project_id: i32,
    },
}

impl UpdateEvent {
    pub fn project(project_id: i32) -> Self {
        UpdateEvent::Update { project_id }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct LiveUpdateBus {
    observers: Arc<RwLock<HashMap<ObserverId, Arc<dyn Observer>>>>,
    next_id: Arc<AtomicU64>,
    send_timeout: Duration,
}

impl Default for LiveUpdateBus {
    fn default() -> Self {
        Self {
            observers: Arc::default(),
            next_id: Arc::default(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl LiveUpdateBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Register an observer; the returned id is used to disconnect it
    pub async fn connect(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, observer);
            observers.len()
        };

        metrics::set_observers(count);
        debug!(observer_id = id, observers = count, "Observer connected");
        id
    }

    /// Remove an observer. Returns false if it was already gone.
    pub async fn disconnect(&self, id: ObserverId) -> bool {
        let (removed, count) = {
            let mut observers = self.observers.write().await;
            let removed = observers.remove(&id).is_some();
            (removed, observers.len())
        };

        if removed {
            metrics::set_observers(count);
            debug!(observer_id = id, observers = count, "Observer disconnected");
        }
        removed
    }

    /// Deliver an event to every observer connected when the call starts.
    pub async fn broadcast(&self, event: &UpdateEvent) -> BroadcastReport {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize update event");
                return BroadcastReport::default();
            }
        };

        let snapshot: Vec<(ObserverId, Arc<dyn Observer>)> = self
            .observers
            .read()
            .await
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        if snapshot.is_empty() {
            return BroadcastReport::default();
        }

        let send_timeout = self.send_timeout;
        let results = join_all(snapshot.iter().map(|(id, observer)| {
            let payload = payload.as_str();
            async move {
                let result = match tokio::time::timeout(send_timeout, observer.send(payload)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("send timed out after {:?}", send_timeout)),
                };
                (*id, result)
            }
        }))
        .await;

        let failed: Vec<ObserverId> = results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    warn!(observer_id = id, error = %e, "Dropping observer after failed send");
                    Some(id)
                }
            })
            .collect();

        if !failed.is_empty() {
            let count = {
                let mut observers = self.observers.write().await;
                for id in &failed {
                    observers.remove(id);
                }
                observers.len()
            };
            metrics::set_observers(count);
        }

        let report = BroadcastReport {
            delivered: snapshot.len() - failed.len(),
            dropped: failed.len(),
        };
        metrics::record_broadcast(report.delivered, report.dropped);
        debug!(delivered = report.delivered, dropped = report.dropped, "Broadcast complete");
        report
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        frames: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Observer for Recorder {
        async fn send(&self, payload: &str) -> anyhow::Result<()> {
            self.frames.lock().unwrap().push(payload.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Observer for Broken {
        async fn send(&self, _payload: &str) -> anyhow::Result<()> {
            anyhow::bail!("connection reset")
        }
    }

    struct Stalled;

    #[async_trait]
    impl Observer for Stalled {
        async fn send(&self, _payload: &str) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_string(&UpdateEvent::project(12)).unwrap();
        assert_eq!(json, r#"{"type":"update","projectId":12}"#);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer() {
        let bus = LiveUpdateBus::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        bus.connect(first.clone()).await;
        bus.connect(second.clone()).await;

        let report = bus.broadcast(&UpdateEvent::project(3)).await;

        assert_eq!(report, BroadcastReport { delivered: 2, dropped: 0 });
        for recorder in [&first, &second] {
            assert_eq!(
                recorder.frames.lock().unwrap().as_slice(),
                [r#"{"type":"update","projectId":3}"#]
            );
        }
    }

    #[tokio::test]
    async fn test_failed_observer_is_removed() {
        let bus = LiveUpdateBus::new();
        let healthy = Arc::new(Recorder::default());
        bus.connect(healthy.clone()).await;
        bus.connect(Arc::new(Broken)).await;

        let report = bus.broadcast(&UpdateEvent::project(1)).await;
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(bus.observer_count().await, 1);

        let report = bus.broadcast(&UpdateEvent::project(2)).await;
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 0 });
        assert_eq!(healthy.frames.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let bus = LiveUpdateBus::new();
        let recorder = Arc::new(Recorder::default());
        let id = bus.connect(recorder.clone()).await;

        assert!(bus.disconnect(id).await);
        assert!(!bus.disconnect(id).await);

        let report = bus.broadcast(&UpdateEvent::project(5)).await;
        assert_eq!(report, BroadcastReport::default());
        assert!(recorder.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observer_ids_are_unique() {
        let bus = LiveUpdateBus::new();
        let a = bus.connect(Arc::new(Recorder::default())).await;
        let b = bus.connect(Arc::new(Recorder::default())).await;
        assert_ne!(a, b);
        assert_eq!(bus.observer_count().await, 2);
    }

    #[tokio::test]
    async fn test_stalled_observer_is_dropped_after_timeout() {
        let bus = LiveUpdateBus::new().with_send_timeout(Duration::from_millis(50));
        let healthy = Arc::new(Recorder::default());
        bus.connect(healthy.clone()).await;
        bus.connect(Arc::new(Stalled)).await;

        let started = std::time::Instant::now();
        let report = bus.broadcast(&UpdateEvent::project(9)).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(bus.observer_count().await, 1);
        assert_eq!(healthy.frames.lock().unwrap().len(), 1);
    }
}
