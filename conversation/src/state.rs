//! Shared cells for challenge state and the active identity.
//!
//! Both are written from one place each (the poller, the session) and read
//! everywhere; cheap clones share the same slot.

use std::sync::{Arc, Mutex};

use jailpool_types::{ChallengeSnapshot, PublicKey};

/// The most recent [`ChallengeSnapshot`], replaced wholesale on each
/// successful poll.
#[derive(Clone, Default)]
pub struct ChallengeState {
    inner: Arc<Mutex<Option<ChallengeSnapshot>>>,
}

impl ChallengeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<ChallengeSnapshot> {
        self.inner.lock().expect("challenge state poisoned").clone()
    }

    pub fn replace(&self, snapshot: ChallengeSnapshot) {
        *self.inner.lock().expect("challenge state poisoned") = Some(snapshot);
    }
}

/// The identity currently driving the session, if a wallet is connected.
///
/// Written only by connect/disconnect; read by the poller's transcript
/// replacement rule.
#[derive(Clone, Default)]
pub struct ActiveIdentity {
    inner: Arc<Mutex<Option<PublicKey>>>,
}

impl ActiveIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, identity: PublicKey) {
        *self.inner.lock().expect("active identity poisoned") = Some(identity);
    }

    pub fn disconnect(&self) {
        *self.inner.lock().expect("active identity poisoned") = None;
    }

    pub fn current(&self) -> Option<PublicKey> {
        self.inner.lock().expect("active identity poisoned").clone()
    }
}
