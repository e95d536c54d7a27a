//! Session credentials and one-shot identity proofs.

use serde::{Deserialize, Serialize};

use crate::keys::{PublicKey, Signature};
use crate::time::Timestamp;

/// A server-issued token standing in for repeated wallet re-signing.
///
/// Invariant (enforced by the credential store, not by callers): a credential
/// is only ever attached to requests made on behalf of `identity`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub token: String,
    pub identity: PublicKey,
}

impl SessionCredential {
    pub fn new(token: impl Into<String>, identity: PublicKey) -> Self {
        Self {
            token: token.into(),
            identity,
        }
    }

    /// The `Authorization` header value for this credential.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// A one-shot signed challenge proving control of an identity.
///
/// Each proof embeds a fresh timestamp so it cannot be replayed; the server
/// rejects stale ones. Deliberately not serializable as a whole: proofs are
/// consumed immediately and never persisted.
#[derive(Debug)]
pub struct SignedAuthProof {
    /// The exact challenge string that was signed.
    pub message: String,
    pub signature: Signature,
    pub identity: PublicKey,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header() {
        let cred = SessionCredential::new("jwt-abc", PublicKey([1; 32]));
        assert_eq!(cred.bearer(), "Bearer jwt-abc");
    }
}
