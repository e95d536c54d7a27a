//! Nullable chain client. Confirmation verdicts on a programmable schedule.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use jailpool_payment::{ChainClient, ChainError, ConfirmationStatus, TransactionSignature};

/// A chain that confirms any transaction after a fixed number of status
/// polls, or answers with a scripted verdict.
pub struct NullChainClient {
    polls_until_confirmed: u64,
    polls: AtomicU64,
    verdict: Mutex<Option<Result<ConfirmationStatus, ChainError>>>,
}

impl NullChainClient {
    /// Confirms on the first poll.
    pub fn instant() -> Self {
        Self::confirming_after(0)
    }

    /// Returns `None` for the first `polls` status checks, then confirms.
    pub fn confirming_after(polls: u64) -> Self {
        Self {
            polls_until_confirmed: polls,
            polls: AtomicU64::new(0),
            verdict: Mutex::new(None),
        }
    }

    /// A chain on which the transaction errored.
    pub fn failing(reason: &str) -> Self {
        let chain = Self::instant();
        *chain.verdict.lock().expect("null chain poisoned") =
            Some(Ok(ConfirmationStatus::Failed(reason.to_string())));
        chain
    }

    /// A chain whose RPC always errors.
    pub fn unreachable(reason: &str) -> Self {
        let chain = Self::instant();
        *chain.verdict.lock().expect("null chain poisoned") =
            Some(Err(ChainError::Rpc(reason.to_string())));
        chain
    }

    /// How many status checks have been made.
    pub fn polls_seen(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for NullChainClient {
    async fn confirmation_status(
        &self,
        _signature: &TransactionSignature,
    ) -> Result<Option<ConfirmationStatus>, ChainError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(verdict) = self.verdict.lock().expect("null chain poisoned").as_ref() {
            return match verdict {
                Ok(status) => Ok(Some(status.clone())),
                Err(ChainError::Rpc(reason)) => Err(ChainError::Rpc(reason.clone())),
            };
        }
        if self.polls.load(Ordering::SeqCst) > self.polls_until_confirmed {
            Ok(Some(ConfirmationStatus::Confirmed))
        } else {
            Ok(None)
        }
    }
}
