//! Session credential cache, scoped to the identity that earned it.
//!
//! This is the single chokepoint preventing credential reuse across wallets:
//! `get` refuses to return a credential whose owning identity does not match
//! the requested one, and drops the stale credential eagerly so a wallet
//! switch can never leak the previous wallet's token.

use std::sync::{Arc, Mutex};

use jailpool_types::{PublicKey, SessionCredential};

/// Shared cache for at most one session credential.
///
/// Cheap to clone; all clones share the same slot. Written by exactly one
/// path (a successful proof exchange) and invalidated by exactly one
/// condition (identity mismatch or explicit [`clear`](Self::clear)).
#[derive(Clone, Default)]
pub struct CredentialStore {
    slot: Arc<Mutex<Option<SessionCredential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached credential for `identity`, if one is stored for exactly
    /// that identity. A mismatch discards the stored credential immediately.
    pub fn get(&self, identity: &PublicKey) -> Option<SessionCredential> {
        let mut slot = self.slot.lock().expect("credential store poisoned");
        match slot.as_ref() {
            Some(cred) if &cred.identity == identity => slot.clone(),
            Some(_) => {
                tracing::debug!("identity changed, discarding cached credential");
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Store a freshly exchanged credential, replacing any previous one.
    pub fn put(&self, credential: SessionCredential) {
        let mut slot = self.slot.lock().expect("credential store poisoned");
        *slot = Some(credential);
    }

    /// Discard the cached credential (disconnect, or server rejection).
    pub fn clear(&self) {
        let mut slot = self.slot.lock().expect("credential store poisoned");
        *slot = None;
    }
}
