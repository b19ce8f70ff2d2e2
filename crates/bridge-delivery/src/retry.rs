//! Fixed backoff retry schedule.
//!
//! The schedule is `1s, 3s, 9s`, indexed by the failing attempt number.
//! Three schedule entries mean three total attempts: attempt 1 failing
//! schedules attempt 2 after 1s, attempt 2 failing schedules attempt 3
//! after 3s, and attempt 3 failing is terminal.

use std::time::Duration;

/// Backoff delays indexed by the 1-based failing attempt number.
pub const RETRY_SCHEDULE: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(9)];

/// Total attempts per delivery sequence.
pub const MAX_ATTEMPTS: u32 = RETRY_SCHEDULE.len() as u32;

/// Outcome of the retry decision after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule the next attempt after the given delay.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
    },
    /// The schedule is exhausted; the delivery is terminally failed.
    GiveUp,
}

/// Decides whether a failed attempt gets a retry.
///
/// `attempt` is the 1-based number of the attempt that just failed.
pub fn after_failed_attempt(attempt: u32) -> RetryDecision {
    if attempt < MAX_ATTEMPTS {
        let index = usize::try_from(attempt).unwrap_or(usize::MAX).saturating_sub(1);
        RetryDecision::Retry { delay: RETRY_SCHEDULE[index.min(RETRY_SCHEDULE.len() - 1)] }
    } else {
        RetryDecision::GiveUp
    }
}
