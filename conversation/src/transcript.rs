//! The append-only message history of one challenge.
//!
//! The transcript has three writers, each with a narrow contract: the
//! submitter pushes an optimistic user echo, the stream consumer folds reply
//! chunks into the last assistant message, and the poller may replace the
//! whole history with a server snapshot when the replacement rule allows it.

use std::sync::{Arc, Mutex};

use jailpool_types::{ChatMessage, PublicKey, Role, Timestamp};

/// Shared, ordered message history. Clones share the same storage.
#[derive(Clone, Default)]
pub struct Transcript {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A point-in-time copy of the history.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().expect("transcript poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().expect("transcript poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a message (the optimistic user echo, mainly).
    pub fn push(&self, message: ChatMessage) {
        self.messages
            .lock()
            .expect("transcript poisoned")
            .push(message);
    }

    /// Fold one reply chunk into the last assistant message, creating that
    /// message on the first chunk.
    pub fn append_assistant_chunk(&self, chunk: &str, date: Timestamp) {
        let mut messages = self.messages.lock().expect("transcript poisoned");
        match messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.content.push_str(chunk);
                last.date = date;
            }
            _ => messages.push(ChatMessage::assistant(chunk, date)),
        }
    }

    /// Mark the most recent user message as failed (its submission aborted
    /// after the echo was shown).
    pub fn mark_last_user_failed(&self) {
        let mut messages = self.messages.lock().expect("transcript poisoned");
        if let Some(last) = messages
            .iter_mut()
            .rev()
            .find(|m| m.role == Role::User)
        {
            last.failed = true;
        }
    }

    /// Mark the most recent assistant message as incomplete (stream cut
    /// short). The partial content stays.
    pub fn mark_last_assistant_incomplete(&self) {
        let mut messages = self.messages.lock().expect("transcript poisoned");
        if let Some(last) = messages
            .iter_mut()
            .rev()
            .find(|m| m.role == Role::Assistant)
        {
            last.incomplete = true;
        }
    }

    /// Offer a server snapshot of the history. Returns whether it was taken.
    ///
    /// Accepted when:
    /// - `initial` is set (first load of the challenge view), or
    /// - the server's latest message was not authored on behalf of the
    ///   active identity, meaning a remote participant moved the
    ///   conversation forward.
    ///
    /// Rejected otherwise, so a locally-optimistic send the server has not
    /// indexed yet is never overwritten. Callers must not offer snapshots
    /// while a reply is streaming; the poller enforces that with the
    /// streaming flag.
    pub fn accept_snapshot(
        &self,
        snapshot: Vec<ChatMessage>,
        active_identity: Option<&PublicKey>,
        initial: bool,
    ) -> bool {
        if !initial {
            let ours = match (snapshot.last().and_then(|m| m.address.as_ref()), active_identity) {
                (Some(address), Some(identity)) => address.belongs_to(identity),
                _ => false,
            };
            if ours {
                return false;
            }
        }
        *self.messages.lock().expect("transcript poisoned") = snapshot;
        true
    }
}
