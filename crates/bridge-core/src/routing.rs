//! Pure event-type pattern matching.
//!
//! A pattern is the literal wildcard `*`, a prefix pattern ending in `*`,
//! or an exact event-type string. Routing performs no I/O and is
//! order-independent over the pattern set.

use crate::models::Subscriber;

/// The catch-all pattern every subscriber defaults to.
pub const WILDCARD: &str = "*";

/// Returns true if any pattern in the set matches the event type.
pub fn matches_event_pattern(patterns: &[String], event_type: &str) -> bool {
    patterns.iter().any(|pattern| pattern_matches(pattern, event_type))
}

/// Returns true if the subscriber is enabled and listens for the event type.
pub fn subscriber_matches(subscriber: &Subscriber, event_type: &str) -> bool {
    subscriber.enabled && matches_event_pattern(&subscriber.events, event_type)
}

fn pattern_matches(pattern: &str, event_type: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return event_type.starts_with(prefix);
    }
    pattern == event_type
}

/// Normalizes a raw pattern list into the stored form.
///
/// Blank entries are dropped, duplicates removed preserving first
/// occurrence, and an empty result falls back to the catch-all wildcard.
pub fn normalize_patterns(raw: Vec<String>) -> Vec<String> {
    let mut patterns = Vec::new();
    for entry in raw {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !patterns.iter().any(|existing| existing == trimmed) {
            patterns.push(trimmed.to_string());
        }
    }
    if patterns.is_empty() {
        patterns.push(WILDCARD.to_string());
    }
    patterns
}
