//! Bounded confirmation waiting against the chain oracle.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::error::PaymentError;
use crate::wallet::TransactionSignature;

/// Errors from the chain RPC.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain rpc error: {0}")]
    Rpc(String),
}

/// Terminal outcome of a broadcast transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// The network accepted the broadcast but the transaction errored.
    Failed(String),
}

/// Read-only view of the network, sufficient to track one transaction.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The transaction's status, or `None` while the network has not yet
    /// reached a verdict.
    async fn confirmation_status(
        &self,
        signature: &TransactionSignature,
    ) -> Result<Option<ConfirmationStatus>, ChainError>;
}

/// Poll the chain until `signature` confirms, fails, or `timeout` elapses.
///
/// Transient RPC errors are logged and retried on the next poll; only the
/// overall bound turns them into a failure. A network-reported error status
/// is terminal immediately.
pub async fn await_confirmation(
    chain: &dyn ChainClient,
    signature: &TransactionSignature,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), PaymentError> {
    let wait = async {
        loop {
            match chain.confirmation_status(signature).await {
                Ok(Some(ConfirmationStatus::Confirmed)) => return Ok(()),
                Ok(Some(ConfirmationStatus::Failed(reason))) => {
                    return Err(PaymentError::TransactionFailed(reason));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%signature, error = %e, "confirmation poll failed, retrying");
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(PaymentError::ConfirmationTimeout),
    }
}
