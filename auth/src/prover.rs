//! Identity proving: turning a wallet's signing capability into a one-shot
//! [`SignedAuthProof`].

use async_trait::async_trait;
use thiserror::Error;

use jailpool_types::{KeyPair, PublicKey, Signature, SignedAuthProof, Timestamp};

use crate::error::AuthError;

/// Failures reported by a wallet when asked to sign.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing prompt declined")]
    Rejected,

    #[error("wallet unavailable")]
    Unavailable,
}

/// The opaque wallet oracle: something that can sign arbitrary bytes on
/// behalf of one identity.
///
/// Signing is user-paced (a hardware or browser wallet shows a prompt), so
/// `sign_message` may take arbitrarily long and may be declined.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The identity currently able to sign, or `None` when disconnected.
    fn identity(&self) -> Option<PublicKey>;

    /// Request a signature over `message`.
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;
}

/// A signer backed by a locally held key pair. Always approves.
///
/// Useful for bots and integration tests; interactive wallets implement
/// [`WalletSigner`] against their own prompt machinery.
pub struct LocalSigner {
    keypair: KeyPair,
}

impl LocalSigner {
    pub fn new(keypair: KeyPair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for LocalSigner {
    fn identity(&self) -> Option<PublicKey> {
        Some(self.keypair.public)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        Ok(jailpool_crypto::sign_message(message, &self.keypair.private))
    }
}

/// Builds one-shot identity proofs by signing a freshly generated challenge
/// string through the wallet.
///
/// Each call produces a new challenge embedding the current timestamp, so
/// proofs cannot be replayed past the server's staleness window. The prover
/// never touches the credential store.
pub struct IdentityProver {
    signer: std::sync::Arc<dyn WalletSigner>,
}

impl IdentityProver {
    pub fn new(signer: std::sync::Arc<dyn WalletSigner>) -> Self {
        Self { signer }
    }

    /// The challenge string signed by the wallet.
    pub fn challenge_message(timestamp: Timestamp) -> String {
        format!("Authenticate with your wallet: {}", timestamp.as_millis())
    }

    /// Prove control of `identity` with a freshly timestamped challenge.
    pub async fn prove(&self, identity: &PublicKey) -> Result<SignedAuthProof, AuthError> {
        self.prove_at(identity, Timestamp::now()).await
    }

    /// Like [`prove`](Self::prove) with an explicit timestamp (deterministic
    /// tests).
    pub async fn prove_at(
        &self,
        identity: &PublicKey,
        now: Timestamp,
    ) -> Result<SignedAuthProof, AuthError> {
        match self.signer.identity() {
            Some(connected) if &connected == identity => {}
            _ => return Err(AuthError::IdentityUnavailable),
        }

        let message = Self::challenge_message(now);
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| match e {
                SignerError::Rejected => AuthError::UserRejected,
                SignerError::Unavailable => AuthError::IdentityUnavailable,
            })?;

        Ok(SignedAuthProof {
            message,
            signature,
            identity: *identity,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jailpool_crypto::keypair_from_seed;
    use std::sync::Arc;

    /// A signer that always declines the prompt.
    struct DecliningSigner {
        identity: PublicKey,
    }

    #[async_trait]
    impl WalletSigner for DecliningSigner {
        fn identity(&self) -> Option<PublicKey> {
            Some(self.identity)
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Signature, SignerError> {
            Err(SignerError::Rejected)
        }
    }

    #[tokio::test]
    async fn proof_signs_the_challenge_message() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let identity = kp.public;
        let prover = IdentityProver::new(Arc::new(LocalSigner::new(kp)));

        let now = Timestamp::new(1_700_000_000_000);
        let proof = prover.prove_at(&identity, now).await.unwrap();

        assert_eq!(proof.message, "Authenticate with your wallet: 1700000000000");
        assert_eq!(proof.identity, identity);
        assert!(jailpool_crypto::verify_signature(
            proof.message.as_bytes(),
            &proof.signature,
            &identity
        ));
    }

    #[tokio::test]
    async fn fresh_timestamp_per_proof() {
        let kp = keypair_from_seed(&[2u8; 32]);
        let identity = kp.public;
        let prover = IdentityProver::new(Arc::new(LocalSigner::new(kp)));

        let p1 = prover.prove_at(&identity, Timestamp::new(1_000)).await.unwrap();
        let p2 = prover.prove_at(&identity, Timestamp::new(2_000)).await.unwrap();
        assert_ne!(p1.message, p2.message);
        assert_ne!(p1.signature, p2.signature);
    }

    #[tokio::test]
    async fn mismatched_identity_is_unavailable() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let other = keypair_from_seed(&[4u8; 32]).public;
        let prover = IdentityProver::new(Arc::new(LocalSigner::new(kp)));

        let err = prover.prove(&other).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityUnavailable));
    }

    #[tokio::test]
    async fn declined_prompt_is_user_rejected() {
        let identity = keypair_from_seed(&[5u8; 32]).public;
        let prover = IdentityProver::new(Arc::new(DecliningSigner {
            identity,
        }));

        let err = prover.prove(&identity).await.unwrap_err();
        assert!(matches!(err, AuthError::UserRejected));
    }
}
