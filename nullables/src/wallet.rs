//! Nullable wallets. Deterministic keys, programmable consent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use jailpool_auth::{SignerError, WalletSigner};
use jailpool_payment::{PaymentWallet, PaymentWalletError, TransactionSignature, UnsignedTransaction};
use jailpool_types::{KeyPair, PublicKey, Signature};

/// A wallet signer over a seeded key pair.
///
/// Approves every signing request unless told to reject, and can be
/// "disconnected" to report no identity.
pub struct NullWalletSigner {
    keypair: KeyPair,
    connected: AtomicBool,
    reject_next: AtomicBool,
    signatures_made: AtomicU64,
}

impl NullWalletSigner {
    /// A signer whose key pair is derived from `seed`, so the identity is
    /// stable across test runs.
    pub fn seeded(seed: u8) -> Self {
        Self {
            keypair: jailpool_crypto::keypair_from_seed(&[seed; 32]),
            connected: AtomicBool::new(true),
            reject_next: AtomicBool::new(false),
            signatures_made: AtomicU64::new(0),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Decline the next signing prompt.
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// How many signatures the wallet has produced.
    pub fn signatures_made(&self) -> u64 {
        self.signatures_made.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for NullWalletSigner {
    fn identity(&self) -> Option<PublicKey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.keypair.public)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SignerError::Unavailable);
        }
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(SignerError::Rejected);
        }
        self.signatures_made.fetch_add(1, Ordering::SeqCst);
        Ok(jailpool_crypto::sign_message(message, &self.keypair.private))
    }
}

/// A payment wallet that "broadcasts" instantly with synthetic signatures.
pub struct NullPaymentWallet {
    decline_next: AtomicBool,
    broadcast_error: Mutex<Option<String>>,
    broadcasts: Mutex<Vec<UnsignedTransaction>>,
    counter: AtomicU64,
}

impl NullPaymentWallet {
    pub fn new() -> Self {
        Self {
            decline_next: AtomicBool::new(false),
            broadcast_error: Mutex::new(None),
            broadcasts: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Decline the next transaction prompt.
    pub fn decline_next(&self) {
        self.decline_next.store(true, Ordering::SeqCst);
    }

    /// Fail the next broadcast with `reason`.
    pub fn fail_next_broadcast(&self, reason: &str) {
        *self.broadcast_error.lock().expect("null wallet poisoned") = Some(reason.to_string());
    }

    /// Every transaction blob the wallet was asked to sign (for assertions).
    pub fn broadcasts(&self) -> Vec<UnsignedTransaction> {
        self.broadcasts.lock().expect("null wallet poisoned").clone()
    }
}

impl Default for NullPaymentWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentWallet for NullPaymentWallet {
    async fn sign_and_broadcast(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<TransactionSignature, PaymentWalletError> {
        if self.decline_next.swap(false, Ordering::SeqCst) {
            return Err(PaymentWalletError::Declined);
        }
        if let Some(reason) = self.broadcast_error.lock().expect("null wallet poisoned").take() {
            return Err(PaymentWalletError::Broadcast(reason));
        }
        self.broadcasts
            .lock()
            .expect("null wallet poisoned")
            .push(transaction.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionSignature::new(format!("null-sig-{n}")))
    }
}
