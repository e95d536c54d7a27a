//! Conversation message types.

use serde::{Deserialize, Serialize};

use crate::keys::WalletAddress;
use crate::time::Timestamp;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a challenge transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Author identity for user messages; the agent replies carry the
    /// address of the user they responded to.
    #[serde(default)]
    pub address: Option<WalletAddress>,
    pub date: Timestamp,
    /// Set on the message that won the challenge.
    #[serde(default)]
    pub win: bool,
    /// Local-only: an optimistic echo whose submission was aborted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    /// Local-only: a streamed reply cut short by a transport error. The
    /// partial content is kept (the attempt was paid for).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

impl ChatMessage {
    /// A user message authored by `address`.
    pub fn user(content: impl Into<String>, address: WalletAddress, date: Timestamp) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            address: Some(address),
            date,
            win: false,
            failed: false,
            incomplete: false,
        }
    }

    /// An assistant message with initial content.
    pub fn assistant(content: impl Into<String>, date: Timestamp) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            address: None,
            date,
            win: false,
            failed: false,
            incomplete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        let r: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(r, Role::Assistant);
    }

    #[test]
    fn failed_flag_skipped_when_false() {
        let msg = ChatMessage::assistant("hi", Timestamp::new(1));
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("failed").is_none());
    }

    #[test]
    fn deserializes_server_history_entry() {
        let json = r#"{"role":"user","content":"hello","address":"abc123","date":1700000000000}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.address, Some(WalletAddress::new("abc123")));
        assert!(!msg.win);
        assert!(!msg.failed);
    }
}
