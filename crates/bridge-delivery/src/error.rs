//! Error types for delivery attempts.
//!
//! These errors stay inside the pipeline: attempt failures feed the retry
//! schedule and the subscriber's `last_error` string, and are never raised
//! to the caller of `emit`.

use thiserror::Error;

/// Failure modes of a single delivery attempt or of pipeline setup.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Network-level connectivity failure.
    #[error("network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// HTTP request timeout exceeded.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// The HTTP client could not be constructed.
    #[error("client configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The canonical event body could not be encoded.
    #[error("canonical body encoding failed: {message}")]
    Body {
        /// Description of the encoding failure.
        message: String,
    },
}

impl DeliveryError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a body-encoding error.
    pub fn body(message: impl Into<String>) -> Self {
        Self::Body { message: message.into() }
    }
}
