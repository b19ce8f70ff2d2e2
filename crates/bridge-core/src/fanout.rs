//! Secondary fan-out port for real-time observers.
//!
//! The bridge forwards every bridged event to a fan-out publisher after
//! dispatching webhook deliveries. Publishing is fire-and-forget: failures
//! are the publisher's own concern and never touch bridge stats.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::broadcast;

use crate::models::BridgeEvent;

/// Port for the real-time observer channel.
///
/// Implementations must not block event emission; `publish` should return
/// quickly and swallow downstream failures (logging them at most).
#[async_trait::async_trait]
pub trait FanoutPublisher: Send + Sync + std::fmt::Debug {
    /// Pushes one event to the observer channel, best-effort.
    async fn publish(&self, event: &BridgeEvent);

    /// Returns this publisher's opaque status object.
    fn status(&self) -> serde_json::Value;
}

/// Fan-out publisher that discards all events.
///
/// Used when no observer channel is configured and in tests that only
/// exercise webhook delivery.
#[derive(Debug, Default)]
pub struct NoOpPublisher;

impl NoOpPublisher {
    /// Creates a new no-op publisher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl FanoutPublisher for NoOpPublisher {
    async fn publish(&self, _event: &BridgeEvent) {}

    fn status(&self) -> serde_json::Value {
        serde_json::json!({ "enabled": false })
    }
}

/// Broadcast-channel fan-out for in-process observers.
///
/// Wraps a `tokio::sync::broadcast` channel. Observers that fall behind
/// lose events (the channel drops the oldest entries), which is acceptable
/// for a best-effort observer feed.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<BridgeEvent>,
    published: Arc<AtomicU64>,
}

impl BroadcastPublisher {
    /// Creates a publisher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, published: Arc::new(AtomicU64::new(0)) }
    }

    /// Subscribes a new observer to the event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl FanoutPublisher for BroadcastPublisher {
    async fn publish(&self, event: &BridgeEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // Send fails only when no receiver is subscribed; that is not an
        // error for a fire-and-forget feed.
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(event_id = %event.id, "no fan-out observers subscribed");
        }
    }

    fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "channel": "broadcast",
            "receivers": self.sender.receiver_count(),
            "published": self.published.load(Ordering::Relaxed),
        })
    }
}
