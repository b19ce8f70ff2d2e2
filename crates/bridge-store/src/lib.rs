//! Subscriber and delivery-stats persistence port.
//!
//! All persisted bridge state lives behind [`SubscriberStore`]: subscriber
//! records and the singleton delivery-stats row. Two conforming backends
//! are provided, a flat durable JSON file ([`FileStore`]) and SQLite
//! ([`SqliteStore`]), selected by runtime configuration. Both apply their
//! own internal serialization, so callers never coordinate locks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod file;
pub mod sqlite;

use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};

use bridge_core::{
    error::{BridgeError, Result},
    models::{DeliveryStats, Subscriber, SubscriberId},
    routing::normalize_patterns,
};

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// Atomically-merged update to the singleton stats record.
///
/// Counter fields are increments applied to freshly read current values
/// inside the store's own serialization; timestamp fields overwrite only
/// when present. This is the one shape through which stats ever change, so
/// concurrent completions can never lose increments.
#[derive(Debug, Clone, Default)]
pub struct StatsUpdate {
    /// Increment for the delivered counter.
    pub delivered: u64,
    /// Increment for the failed counter.
    pub failed: u64,
    /// Increment for the retries-scheduled counter.
    pub retries_scheduled: u64,
    /// New value for `last_delivery_at`, if any.
    pub last_delivery_at: Option<DateTime<Utc>>,
    /// New value for `last_event_at`, if any.
    pub last_event_at: Option<DateTime<Utc>>,
}

impl StatsUpdate {
    /// Update recorded when a delivery sequence ends in success.
    pub fn delivery_succeeded(at: DateTime<Utc>) -> Self {
        Self { delivered: 1, last_delivery_at: Some(at), ..Self::default() }
    }

    /// Update recorded when a delivery sequence exhausts its retries.
    pub fn delivery_failed(at: DateTime<Utc>) -> Self {
        Self { failed: 1, last_delivery_at: Some(at), ..Self::default() }
    }

    /// Update recorded when a retry is scheduled.
    pub fn retry_scheduled() -> Self {
        Self { retries_scheduled: 1, ..Self::default() }
    }

    /// Update recorded when a bridgeable event is emitted.
    pub fn event_seen(at: DateTime<Utc>) -> Self {
        Self { last_event_at: Some(at), ..Self::default() }
    }

    /// Merges this update into a stats record.
    ///
    /// Shared by backends that hold the record in memory; the SQLite
    /// backend expresses the same merge as arithmetic SQL instead.
    pub fn apply_to(&self, stats: &mut DeliveryStats, now: DateTime<Utc>) {
        stats.delivered += self.delivered;
        stats.failed += self.failed;
        stats.retries_scheduled += self.retries_scheduled;
        if self.last_delivery_at.is_some() {
            stats.last_delivery_at = self.last_delivery_at;
        }
        if self.last_event_at.is_some() {
            stats.last_event_at = self.last_event_at;
        }
        stats.updated_at = now;
    }
}

/// Persistence port owning subscriber records and delivery statistics.
///
/// Both backends guarantee read-your-writes within the process and
/// serialized writers per subscriber id. Secrets are retrievable through
/// this trait; stripping them is the facade's job at external boundaries.
#[async_trait::async_trait]
pub trait SubscriberStore: Send + Sync + 'static {
    /// Lists all subscribers in a stable per-backend order.
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Registers a new subscriber.
    ///
    /// Validates the URL, generates the id and signing secret, and
    /// normalizes the pattern list. Returns the full record including the
    /// secret, the only time it leaves the store.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidUrl`] for non-http(s) URLs; nothing
    /// is persisted in that case.
    async fn create_subscriber(&self, url: &str, events: Vec<String>) -> Result<Subscriber>;

    /// Finds a subscriber by id.
    async fn find_subscriber(&self, id: SubscriberId) -> Result<Option<Subscriber>>;

    /// Enables or disables a subscriber, returning the updated record.
    ///
    /// Returns `None` when the id is unknown.
    async fn set_enabled(&self, id: SubscriberId, enabled: bool) -> Result<Option<Subscriber>>;

    /// Deletes a subscriber. Returns true iff a record was removed.
    async fn delete_subscriber(&self, id: SubscriberId) -> Result<bool>;

    /// Records the outcome of one delivery attempt on the subscriber.
    ///
    /// Success sets `last_success_at` and clears `last_error`; failure sets
    /// `last_error`. Always bumps `updated_at`. Silently a no-op when the
    /// subscriber no longer exists (deletion does not cancel in-flight
    /// deliveries).
    async fn update_delivery_result(
        &self,
        id: SubscriberId,
        ok: bool,
        error: Option<&str>,
    ) -> Result<()>;

    /// Returns a snapshot of the singleton stats record.
    async fn stats(&self) -> Result<DeliveryStats>;

    /// Applies an atomically-merged update to the stats record.
    async fn apply_stats(&self, update: StatsUpdate) -> Result<()>;
}

/// Validates that a subscriber URL parses as `http` or `https`.
pub(crate) fn validate_subscriber_url(raw: &str) -> Result<()> {
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(BridgeError::invalid_url(raw)),
    }
}

/// Generates a 256-bit hex-encoded signing secret from the OS CSPRNG.
pub(crate) fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Builds a new subscriber record, validating and normalizing inputs.
///
/// Shared by both backends so creation semantics cannot drift.
pub(crate) fn new_subscriber(url: &str, events: Vec<String>) -> Result<Subscriber> {
    validate_subscriber_url(url)?;
    let now = Utc::now();
    Ok(Subscriber {
        id: SubscriberId::new(),
        url: url.to_string(),
        enabled: true,
        events: normalize_patterns(events),
        secret: generate_secret(),
        created_at: now,
        updated_at: now,
        last_success_at: None,
        last_error: None,
    })
}
