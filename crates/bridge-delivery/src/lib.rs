//! Signed webhook delivery pipeline and the bridge facade.
//!
//! This crate implements the delivery half of the event bridge: it signs
//! canonical event bodies, POSTs them to subscriber endpoints, retries
//! failed attempts on a fixed backoff schedule, and records the outcome in
//! the subscriber store. [`Bridge`] composes the pipeline with the store,
//! router, and fan-out publisher into the single entry point the host
//! application talks to.
//!
//! # Delivery model
//!
//! Each `(event, subscriber)` pair gets its own delivery sequence, spawned
//! as an independent task so `emit` never blocks on network I/O:
//!
//! 1. **Sign** - HMAC-SHA256 over the canonical body, computed once
//! 2. **Attempt** - HTTP POST; any non-2xx or transport error fails it
//! 3. **Retry** - fixed `1s, 3s, 9s` schedule, three attempts total
//! 4. **Account** - terminal outcome recorded in stats and on the subscriber
//!
//! Retry timers are transient: a process restart abandons in-flight
//! sequences without compensating action.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bridge;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod signature;

pub use bridge::{Bridge, BridgeStatus, SubscriberCounts, TEST_EVENT_TYPE};
pub use client::{ClientConfig, DeliveryClient};
pub use error::DeliveryError;
pub use pipeline::DeliveryPipeline;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
