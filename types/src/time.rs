//! Timestamp type used throughout the pipeline.
//!
//! Timestamps are Unix epoch **milliseconds** (UTC). The auth challenge
//! string embeds one, and the server rejects proofs whose timestamp is
//! older than its staleness window, so millisecond precision matters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_millis() as u64;
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_millis: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_since_basic() {
        let t = Timestamp::new(1_000);
        assert_eq!(t.elapsed_since(Timestamp::new(4_500)), 3_500);
    }

    #[test]
    fn elapsed_since_saturates() {
        let t = Timestamp::new(5_000);
        assert_eq!(t.elapsed_since(Timestamp::new(1_000)), 0);
    }

    #[test]
    fn expiry() {
        let t = Timestamp::new(10_000);
        assert!(!t.has_expired(5_000, Timestamp::new(14_999)));
        assert!(t.has_expired(5_000, Timestamp::new(15_000)));
    }

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01 in millis
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }
}
