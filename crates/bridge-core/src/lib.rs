//! Core domain models and routing for the event bridge.
//!
//! Provides strongly-typed domain primitives, the event-type pattern router,
//! the fan-out publisher port, and error handling shared by the store and
//! delivery crates. All other crates depend on these foundational types.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fanout;
pub mod models;
pub mod routing;
pub mod time;

pub use error::{BridgeError, Result};
pub use fanout::{BroadcastPublisher, FanoutPublisher, NoOpPublisher};
pub use models::{
    BridgeEvent, DeliveryStats, EventId, Subscriber, SubscriberId, SubscriberView,
    EVENT_NAMESPACE,
};
pub use routing::{matches_event_pattern, normalize_patterns, subscriber_matches};
pub use time::{Clock, RealClock, TestClock};
