//! Challenge identity and refreshable metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time::Timestamp;

/// Opaque server-side identifier for a challenge (used in submit URLs).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeId(String);

impl ChallengeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable challenge name (used in poll URLs).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeName(String);

impl ChallengeName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// Announced but not yet accepting messages.
    Upcoming,
    /// Accepting paid messages.
    Active,
    /// Won or expired; no further messages accepted.
    Concluded,
}

/// The mutable, frequently-refreshed metadata for one challenge.
///
/// Replaced wholesale on each successful poll; the transcript follows its
/// own replacement rule (see `jailpool-conversation`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSnapshot {
    pub id: ChallengeId,
    pub name: ChallengeName,
    pub status: ChallengeStatus,
    /// Price of one message, in the chain's native unit.
    pub message_price: f64,
    /// Current pooled prize, in the chain's native unit.
    pub prize: f64,
    /// USD quotes computed server-side at poll time.
    pub usd_message_price: f64,
    pub usd_prize: f64,
    /// Total paid attempts so far.
    pub break_attempts: u64,
    /// When the challenge expires; may move forward after each paid message.
    pub expiry: Option<Timestamp>,
    /// Maximum prompt length accepted by this challenge.
    pub character_limit: Option<usize>,
    /// Maximum word length; longer words are split before submission.
    pub characters_per_word: Option<usize>,
}

impl ChallengeSnapshot {
    /// Whether messages can currently be sent to this challenge.
    pub fn accepts_messages(&self) -> bool {
        self.status == ChallengeStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: ChallengeStatus) -> ChallengeSnapshot {
        ChallengeSnapshot {
            id: ChallengeId::new("65a1"),
            name: ChallengeName::new("alcatraz"),
            status,
            message_price: 0.01,
            prize: 5.0,
            usd_message_price: 2.0,
            usd_prize: 1000.0,
            break_attempts: 42,
            expiry: None,
            character_limit: Some(500),
            characters_per_word: None,
        }
    }

    #[test]
    fn only_active_accepts_messages() {
        assert!(snapshot(ChallengeStatus::Active).accepts_messages());
        assert!(!snapshot(ChallengeStatus::Upcoming).accepts_messages());
        assert!(!snapshot(ChallengeStatus::Concluded).accepts_messages());
    }

    #[test]
    fn status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChallengeStatus::Active).unwrap(),
            "\"active\""
        );
        let s: ChallengeStatus = serde_json::from_str("\"concluded\"").unwrap();
        assert_eq!(s, ChallengeStatus::Concluded);
    }
}
