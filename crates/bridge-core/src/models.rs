//! Core domain models and strongly-typed identifiers.
//!
//! Defines subscribers, bridge events, delivery statistics, and newtype ID
//! wrappers. The secret-stripped [`SubscriberView`] projection is the only
//! subscriber shape allowed to cross an external boundary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event-type namespace eligible for bridging.
///
/// Events whose type does not start with this prefix are silently ignored
/// by the bridge; they belong to subsystems that never leave the process.
pub const EVENT_NAMESPACE: &str = "integration_";

/// Strongly-typed subscriber identifier.
///
/// Wraps a UUID to prevent mixing with event IDs. Assigned once at
/// registration and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Creates a new random subscriber ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SubscriberId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Strongly-typed event identifier, unique per emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A registered external HTTP endpoint eligible to receive signed deliveries.
///
/// The `secret` field is the HMAC signing key generated at registration.
/// It is never regenerated and must never leave the process except in the
/// tuple returned at creation time; use [`Subscriber::view`] everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    /// Unique identifier for this subscriber.
    pub id: SubscriberId,

    /// Destination URL for deliveries. Always `http` or `https`.
    pub url: String,

    /// Whether this subscriber participates in routing.
    ///
    /// Disabled subscribers are skipped during routing but keep their
    /// registration and secret.
    pub enabled: bool,

    /// Event-type patterns this subscriber listens for.
    ///
    /// Always non-empty and de-duplicated; defaults to the catch-all `*`.
    pub events: Vec<String>,

    /// Opaque HMAC-SHA256 signing key. Immutable after creation.
    pub secret: String,

    /// When this subscriber was registered.
    pub created_at: DateTime<Utc>,

    /// When any field was last modified, including delivery results.
    pub updated_at: DateTime<Utc>,

    /// Timestamp of the most recent successful delivery.
    pub last_success_at: Option<DateTime<Utc>>,

    /// Description of the most recent failed delivery attempt.
    ///
    /// Cleared on the next successful delivery.
    pub last_error: Option<String>,
}

impl Subscriber {
    /// Returns the secret-stripped projection of this subscriber.
    pub fn view(&self) -> SubscriberView {
        SubscriberView {
            id: self.id,
            url: self.url.clone(),
            enabled: self.enabled,
            events: self.events.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_success_at: self.last_success_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Secret-stripped subscriber projection for external boundaries.
///
/// Every subscriber-shaped response outside the store goes through this
/// type; the signing secret has no field to leak through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberView {
    /// Unique identifier for this subscriber.
    pub id: SubscriberId,
    /// Destination URL for deliveries.
    pub url: String,
    /// Whether this subscriber participates in routing.
    pub enabled: bool,
    /// Event-type patterns this subscriber listens for.
    pub events: Vec<String>,
    /// When this subscriber was registered.
    pub created_at: DateTime<Utc>,
    /// When any field was last modified.
    pub updated_at: DateTime<Utc>,
    /// Timestamp of the most recent successful delivery.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Description of the most recent failed delivery attempt.
    pub last_error: Option<String>,
}

impl From<&Subscriber> for SubscriberView {
    fn from(subscriber: &Subscriber) -> Self {
        subscriber.view()
    }
}

/// A typed, timestamped, payload-bearing notification.
///
/// Serializes to exactly `{id, type, ts, payload}`: the canonical delivery
/// body whose bytes the HMAC signature covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEvent {
    /// Unique identifier for this emission.
    pub id: EventId,

    /// Event type, e.g. `integration_task_completed`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event was emitted.
    pub ts: DateTime<Utc>,

    /// Arbitrary structured payload.
    pub payload: serde_json::Value,
}

impl BridgeEvent {
    /// Creates a new event stamped with a fresh ID and the current time.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self { id: EventId::new(), event_type: event_type.into(), ts: Utc::now(), payload }
    }

    /// Whether this event falls inside the bridged namespace.
    pub fn is_bridgeable(&self) -> bool {
        self.event_type.starts_with(EVENT_NAMESPACE)
    }
}

/// Singleton delivery accounting record.
///
/// Counters are monotonic; they are incremented inside the store's own
/// serialization and never overwritten from stale snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    /// Delivery sequences that ended in success.
    pub delivered: u64,

    /// Delivery sequences that exhausted the retry schedule.
    pub failed: u64,

    /// Retries scheduled across all sequences.
    pub retries_scheduled: u64,

    /// When the most recent sequence reached a terminal outcome.
    pub last_delivery_at: Option<DateTime<Utc>>,

    /// When the most recent bridgeable event was emitted.
    pub last_event_at: Option<DateTime<Utc>>,

    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

impl Default for DeliveryStats {
    fn default() -> Self {
        Self {
            delivered: 0,
            failed: 0,
            retries_scheduled: 0,
            last_delivery_at: None,
            last_event_at: None,
            updated_at: Utc::now(),
        }
    }
}
