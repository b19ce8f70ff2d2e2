//! Delivery sequence execution.
//!
//! One delivery sequence covers one `(event, subscriber)` pair: the initial
//! attempt plus its retries, strictly sequential, run on a spawned task so
//! the dispatcher returns immediately. Sequences hold no durable state;
//! a process restart abandons whatever was sleeping between attempts, which
//! is the documented at-most-one-attempt-sequence gap.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use bridge_core::{
    models::{BridgeEvent, Subscriber, SubscriberId},
    time::Clock,
};
use bridge_store::{StatsUpdate, SubscriberStore};

use crate::{
    client::{DeliveryClient, SignedDelivery},
    retry::{after_failed_attempt, RetryDecision},
    signature,
};

/// In-memory count of delivery sequences that have not reached a terminal
/// outcome. Decrements are clamped at zero.
#[derive(Debug, Default)]
struct PendingCounter(AtomicU64);

impl PendingCounter {
    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        let _ = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }

    fn count(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Dispatches signed delivery sequences and tracks how many are in flight.
pub struct DeliveryPipeline {
    store: Arc<dyn SubscriberStore>,
    client: Arc<DeliveryClient>,
    clock: Arc<dyn Clock>,
    pending: Arc<PendingCounter>,
    shutdown: CancellationToken,
}

impl DeliveryPipeline {
    /// Creates a pipeline over the given store, client, and clock.
    ///
    /// Cancelling `shutdown` aborts pending backoff sleeps; attempts
    /// already on the wire finish normally.
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        client: Arc<DeliveryClient>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { store, client, clock, pending: Arc::new(PendingCounter::default()), shutdown }
    }

    /// Number of delivery sequences currently in flight.
    pub fn pending_count(&self) -> u64 {
        self.pending.count()
    }

    /// Starts an independent delivery sequence for one subscriber.
    ///
    /// Signs the canonical body once, spawns the sequence task, and returns
    /// without waiting for any network I/O.
    pub fn dispatch(&self, subscriber: &Subscriber, event: &BridgeEvent) {
        let body = match signature::canonical_body(event) {
            Ok(body) => body,
            Err(e) => {
                error!(event_id = %event.id, error = %e, "failed to encode canonical body");
                return;
            },
        };
        let delivery = SignedDelivery {
            url: subscriber.url.clone(),
            event_id: event.id,
            event_type: event.event_type.clone(),
            signature: signature::sign(&subscriber.secret, &body),
            body: Arc::new(body),
        };

        let sequence = DeliverySequence {
            store: self.store.clone(),
            client: self.client.clone(),
            clock: self.clock.clone(),
            pending: self.pending.clone(),
            shutdown: self.shutdown.clone(),
            subscriber_id: subscriber.id,
            delivery,
        };

        self.pending.increment();
        tokio::spawn(sequence.run());
    }
}

/// How a delivery sequence ended.
enum SequenceOutcome {
    Delivered,
    Exhausted,
    Abandoned,
}

/// One in-flight delivery sequence.
struct DeliverySequence {
    store: Arc<dyn SubscriberStore>,
    client: Arc<DeliveryClient>,
    clock: Arc<dyn Clock>,
    pending: Arc<PendingCounter>,
    shutdown: CancellationToken,
    subscriber_id: SubscriberId,
    delivery: SignedDelivery,
}

impl DeliverySequence {
    async fn run(self) {
        let span = info_span!(
            "delivery_sequence",
            subscriber_id = %self.subscriber_id,
            event_id = %self.delivery.event_id,
            event_type = %self.delivery.event_type,
        );

        async {
            let outcome = self.attempt_until_terminal().await;

            match outcome {
                SequenceOutcome::Delivered => {
                    self.apply_stats(StatsUpdate::delivery_succeeded(self.clock.now())).await;
                },
                SequenceOutcome::Exhausted => {
                    self.apply_stats(StatsUpdate::delivery_failed(self.clock.now())).await;
                },
                SequenceOutcome::Abandoned => {
                    debug!("delivery sequence abandoned during shutdown");
                },
            }

            self.pending.decrement();
        }
        .instrument(span)
        .await;
    }

    async fn attempt_until_terminal(&self) -> SequenceOutcome {
        let mut attempt: u32 = 1;

        loop {
            let failure = match self.client.deliver(&self.delivery, attempt).await {
                Ok(response) if response.is_success => {
                    info!(status = response.status, attempt, "webhook delivered");
                    self.record_result(true, None).await;
                    return SequenceOutcome::Delivered;
                },
                Ok(response) => format!("endpoint returned HTTP {}", response.status),
                Err(e) => e.to_string(),
            };

            self.record_result(false, Some(&failure)).await;

            match after_failed_attempt(attempt) {
                RetryDecision::Retry { delay } => {
                    self.apply_stats(StatsUpdate::retry_scheduled()).await;
                    warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %failure,
                        "delivery attempt failed, retry scheduled"
                    );
                    attempt += 1;

                    tokio::select! {
                        () = self.clock.sleep(delay) => {},
                        () = self.shutdown.cancelled() => return SequenceOutcome::Abandoned,
                    }
                },
                RetryDecision::GiveUp => {
                    error!(attempt, error = %failure, "delivery failed, retries exhausted");
                    return SequenceOutcome::Exhausted;
                },
            }
        }
    }

    /// Records an attempt outcome on the subscriber, tolerating deletion.
    async fn record_result(&self, ok: bool, error: Option<&str>) {
        if let Err(e) = self.store.update_delivery_result(self.subscriber_id, ok, error).await {
            warn!(error = %e, "failed to record delivery result");
        }
    }

    /// Applies a stats update, logging rather than propagating failures;
    /// accounting must never break the sequence itself.
    async fn apply_stats(&self, update: StatsUpdate) {
        if let Err(e) = self.store.apply_stats(update).await {
            warn!(error = %e, "failed to update delivery stats");
        }
    }
}
