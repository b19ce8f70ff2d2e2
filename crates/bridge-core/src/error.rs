//! Error types and result handling for bridge operations.
//!
//! Defines the structured taxonomy surfaced at external boundaries. Delivery
//! failures never appear here: they are recovered by the retry schedule and
//! only observable through stats and per-subscriber `last_error`.

use thiserror::Error;

use crate::models::SubscriberId;

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by subscriber CRUD and status operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Subscriber registration with a URL that is not `http`/`https`.
    ///
    /// Rejected synchronously; nothing is persisted.
    #[error("invalid subscriber url: {url}")]
    InvalidUrl {
        /// The rejected URL as supplied by the caller.
        url: String,
    },

    /// An operation referenced a subscriber id that does not exist.
    #[error("unknown subscriber: {id}")]
    UnknownSubscriber {
        /// The missing subscriber id.
        id: SubscriberId,
    },

    /// The persistence backend failed.
    #[error("store error: {message}")]
    Store {
        /// Backend error description.
        message: String,
    },
}

impl BridgeError {
    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unknown-subscriber error.
    pub fn unknown_subscriber(id: SubscriberId) -> Self {
        Self::UnknownSubscriber { id }
    }

    /// Creates a store error from a backend failure.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store { message: message.into() }
    }

    /// Returns the stable error code surfaced to API clients.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::UnknownSubscriber { .. } => "unknown_subscriber",
            Self::Store { .. } => "store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BridgeError::invalid_url("ftp://x").code(), "invalid_url");
        assert_eq!(BridgeError::unknown_subscriber(SubscriberId::new()).code(), "unknown_subscriber");
        assert_eq!(BridgeError::store("disk full").code(), "store_error");
    }

    #[test]
    fn display_includes_url() {
        let error = BridgeError::invalid_url("ftp://files.example.com");
        assert_eq!(error.to_string(), "invalid subscriber url: ftp://files.example.com");
    }
}
