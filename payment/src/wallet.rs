//! The payment-wallet oracle: signs and broadcasts a server-built
//! transaction blob.
//!
//! The blob is opaque to the client; only the wallet and the chain interpret
//! it. Signing is user-paced and may be declined.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A server-constructed, unsigned transaction, base64-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction(String);

impl UnsignedTransaction {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

/// The signature / transaction id under which a broadcast transaction is
/// tracked on the network, and later presented as proof of payment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionSignature(String);

impl TransactionSignature {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failures reported by the wallet during sign-and-broadcast.
#[derive(Debug, Error)]
pub enum PaymentWalletError {
    #[error("user declined the transaction")]
    Declined,

    #[error("broadcast failed: {0}")]
    Broadcast(String),
}

/// Something that can sign an unsigned transaction and broadcast it to the
/// network, returning the signature to track it by.
#[async_trait]
pub trait PaymentWallet: Send + Sync {
    async fn sign_and_broadcast(
        &self,
        transaction: &UnsignedTransaction,
    ) -> Result<TransactionSignature, PaymentWalletError>;
}
