//! Bridge facade: the single entry point to the event bridge.
//!
//! Composes the subscriber store, the pattern router, the delivery
//! pipeline, and the secondary fan-out publisher. Everything the host
//! application or API layer does with the bridge goes through [`Bridge`].
//!
//! Secret stripping happens here: every subscriber-shaped response is a
//! [`SubscriberView`], except the `(view, secret)` tuple returned once at
//! registration.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use bridge_core::{
    error::Result,
    fanout::FanoutPublisher,
    models::{BridgeEvent, DeliveryStats, SubscriberId, SubscriberView},
    routing::subscriber_matches,
    time::Clock,
};
use bridge_store::{StatsUpdate, SubscriberStore};

use crate::{
    client::{ClientConfig, DeliveryClient},
    error::DeliveryError,
    pipeline::DeliveryPipeline,
};

/// Event type used by subscriber connectivity probes.
///
/// Inside the bridged namespace but outside normal emission, so receivers
/// can recognize and discard it.
pub const TEST_EVENT_TYPE: &str = "integration_connection_test";

/// Subscriber counts reported by [`Bridge::status`].
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubscriberCounts {
    /// Registered subscribers.
    pub total: usize,
    /// Subscribers currently participating in routing.
    pub enabled: usize,
}

/// Snapshot of bridge health.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    /// Subscriber counts.
    pub subscribers: SubscriberCounts,
    /// Delivery sequences currently in flight.
    pub pending_deliveries: u64,
    /// Persisted delivery accounting.
    pub stats: DeliveryStats,
    /// The fan-out publisher's own status object, passed through opaquely.
    pub fanout: serde_json::Value,
}

/// The event bridge.
pub struct Bridge {
    store: Arc<dyn SubscriberStore>,
    fanout: Arc<dyn FanoutPublisher>,
    pipeline: DeliveryPipeline,
    shutdown: CancellationToken,
}

impl Bridge {
    /// Builds a bridge over the given store, fan-out publisher, and clock.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Configuration`] if the HTTP client cannot
    /// be constructed.
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        fanout: Arc<dyn FanoutPublisher>,
        clock: Arc<dyn Clock>,
        client_config: ClientConfig,
    ) -> std::result::Result<Self, DeliveryError> {
        let shutdown = CancellationToken::new();
        let client = Arc::new(DeliveryClient::new(client_config)?);
        let pipeline = DeliveryPipeline::new(store.clone(), client, clock, shutdown.clone());

        Ok(Self { store, fanout, pipeline, shutdown })
    }

    /// Emits an event into the bridge.
    ///
    /// Events outside the `integration_` namespace are silently ignored.
    /// For bridged events this records `last_event_at`, starts one delivery
    /// sequence per matching enabled subscriber without awaiting any, and
    /// forwards the event to the fan-out publisher. Delivery outcomes are
    /// never observed here; only store failures surface.
    pub async fn emit(&self, event: BridgeEvent) -> Result<()> {
        if !event.is_bridgeable() {
            trace!(event_type = %event.event_type, "event outside bridged namespace, ignored");
            return Ok(());
        }

        self.store.apply_stats(StatsUpdate::event_seen(event.ts)).await?;

        let subscribers = self.store.list_subscribers().await?;
        for subscriber in
            subscribers.iter().filter(|s| subscriber_matches(s, &event.event_type))
        {
            self.pipeline.dispatch(subscriber, &event);
        }

        // Best-effort: the fan-out channel's failures are its own.
        self.fanout.publish(&event).await;

        Ok(())
    }

    /// Lists all subscribers, secrets stripped.
    pub async fn list_subscribers(&self) -> Result<Vec<SubscriberView>> {
        let subscribers = self.store.list_subscribers().await?;
        Ok(subscribers.iter().map(SubscriberView::from).collect())
    }

    /// Registers a subscriber, returning its view and, once only, the
    /// signing secret.
    pub async fn create_subscriber(
        &self,
        url: &str,
        events: Vec<String>,
    ) -> Result<(SubscriberView, String)> {
        let subscriber = self.store.create_subscriber(url, events).await?;
        Ok((subscriber.view(), subscriber.secret))
    }

    /// Enables or disables a subscriber. `None` when the id is unknown.
    pub async fn set_subscriber_enabled(
        &self,
        id: SubscriberId,
        enabled: bool,
    ) -> Result<Option<SubscriberView>> {
        let updated = self.store.set_enabled(id, enabled).await?;
        Ok(updated.map(|s| s.view()))
    }

    /// Deletes a subscriber. In-flight deliveries to it are not cancelled.
    pub async fn delete_subscriber(&self, id: SubscriberId) -> Result<bool> {
        self.store.delete_subscriber(id).await
    }

    /// Sends a connectivity probe through the normal delivery pipeline.
    ///
    /// Targets the one subscriber directly, bypassing pattern routing.
    /// Returns false when the id is unknown; the probe's outcome is
    /// observable through stats and the subscriber's delivery fields.
    pub async fn test_subscriber(&self, id: SubscriberId) -> Result<bool> {
        let Some(subscriber) = self.store.find_subscriber(id).await? else {
            return Ok(false);
        };

        let event = BridgeEvent::new(
            TEST_EVENT_TYPE,
            serde_json::json!({ "message": "bridge connectivity test" }),
        );
        self.pipeline.dispatch(&subscriber, &event);

        Ok(true)
    }

    /// Returns a status snapshot.
    pub async fn status(&self) -> Result<BridgeStatus> {
        let subscribers = self.store.list_subscribers().await?;
        let stats = self.store.stats().await?;

        Ok(BridgeStatus {
            subscribers: SubscriberCounts {
                total: subscribers.len(),
                enabled: subscribers.iter().filter(|s| s.enabled).count(),
            },
            pending_deliveries: self.pipeline.pending_count(),
            stats,
            fanout: self.fanout.status(),
        })
    }

    /// Number of delivery sequences currently in flight.
    pub fn pending_deliveries(&self) -> u64 {
        self.pipeline.pending_count()
    }

    /// Signals shutdown: pending backoff sleeps abort, attempts already on
    /// the wire finish. Abandoned sequences are the documented restart gap.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            warn!(
                pending = self.pipeline.pending_count(),
                "bridge shutting down, abandoning pending retries"
            );
            self.shutdown.cancel();
        }
    }
}
