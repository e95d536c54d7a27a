//! The payment authorization flow: construct, sign/broadcast, confirm.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use jailpool_auth::{ApiRequest, AuthClient};
use jailpool_types::{ChallengeId, PublicKey, SessionCredential};

use crate::chain::{await_confirmation, ChainClient};
use crate::error::PaymentError;
use crate::wallet::{PaymentWallet, PaymentWalletError, TransactionSignature, UnsignedTransaction};

/// Transaction construction endpoint.
pub const PAYMENT_CONSTRUCT_PATH: &str = "/payment/construct";

/// Tunables for the flow, including the treasury split forwarded to the
/// server. The split is a business parameter of the construct request, not a
/// protocol constant; the server owns its interpretation.
#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub confirmation_timeout: Duration,
    pub confirmation_poll_interval: Duration,
    /// Percentage of the transfer diverted to the platform treasury, where
    /// the action type supports one. Forwarded verbatim.
    pub treasury_split_pct: Option<u8>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(60),
            confirmation_poll_interval: Duration::from_millis(500),
            treasury_split_pct: None,
        }
    }
}

/// Cooperative cancellation for an in-flight flow.
///
/// Checked between stages; a disconnect cancels the token so the flow stops
/// at the next checkpoint instead of signing or submitting for a wallet that
/// is no longer active.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One payment-gated action: sending `content` to a challenge.
#[derive(Clone, Debug)]
pub struct PaymentAction {
    pub challenge_id: ChallengeId,
    pub content: String,
    pub identity: PublicKey,
}

/// Lifecycle of an in-flight payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One in-flight payment-gated action, from construction to confirmation.
#[derive(Debug)]
pub struct PendingPayment {
    pub unsigned_transaction: UnsignedTransaction,
    pub action_id: String,
    /// Credential issued alongside the transaction, if the server bundled one.
    pub credential: Option<SessionCredential>,
    pub status: PaymentStatus,
}

/// A signed, broadcast, not-yet-confirmed payment. Produced by
/// [`PaymentFlow::begin`], consumed by [`PaymentFlow::finish`].
#[derive(Debug)]
pub struct BroadcastPayment {
    pub transaction_signature: TransactionSignature,
    pending: PendingPayment,
}

/// The output of a successful flow: everything the submission step needs.
#[derive(Clone, Debug)]
pub struct AuthorizedPayment {
    pub transaction_signature: TransactionSignature,
    pub action_id: String,
    pub credential: SessionCredential,
}

#[derive(Debug, Deserialize)]
struct ConstructResponse {
    #[serde(rename = "unsignedTransaction", alias = "serializedTransaction")]
    unsigned_transaction: String,
    #[serde(rename = "actionId", alias = "transactionId")]
    action_id: String,
    #[serde(default)]
    token: Option<String>,
}

/// Drives one payment from construction to confirmed, strictly in order.
pub struct PaymentFlow {
    auth: Arc<AuthClient>,
    wallet: Arc<dyn PaymentWallet>,
    chain: Arc<dyn ChainClient>,
    config: PaymentConfig,
}

impl PaymentFlow {
    pub fn new(
        auth: Arc<AuthClient>,
        wallet: Arc<dyn PaymentWallet>,
        chain: Arc<dyn ChainClient>,
        config: PaymentConfig,
    ) -> Self {
        Self {
            auth,
            wallet,
            chain,
            config,
        }
    }

    /// Authorize `action`: construct the transaction server-side, have the
    /// wallet sign and broadcast it, and wait for network confirmation.
    ///
    /// Returns only once the payment is confirmed; the caller may then (and
    /// only then) submit the gated action.
    pub async fn authorize(
        &self,
        action: &PaymentAction,
        cancel: &CancelToken,
    ) -> Result<AuthorizedPayment, PaymentError> {
        let broadcast = self.begin(action, cancel).await?;
        self.finish(action, broadcast, cancel).await
    }

    /// First half of the flow: construct the transaction and have the
    /// wallet sign and broadcast it. This is the user-paced stage; callers
    /// that surface progress switch from "awaiting signature" to "awaiting
    /// confirmation" once it returns.
    pub async fn begin(
        &self,
        action: &PaymentAction,
        cancel: &CancelToken,
    ) -> Result<BroadcastPayment, PaymentError> {
        let pending = self.construct(action).await?;

        if cancel.is_cancelled() {
            return Err(PaymentError::Aborted);
        }

        tracing::info!(
            challenge = %action.challenge_id,
            action_id = %pending.action_id,
            "requesting wallet signature"
        );
        let signature = match self
            .wallet
            .sign_and_broadcast(&pending.unsigned_transaction)
            .await
        {
            Ok(sig) => sig,
            Err(PaymentWalletError::Declined) => return Err(PaymentError::SigningDeclined),
            Err(PaymentWalletError::Broadcast(reason)) => {
                return Err(PaymentError::TransactionFailed(reason));
            }
        };

        tracing::info!(%signature, "transaction broadcast");
        Ok(BroadcastPayment {
            transaction_signature: signature,
            pending,
        })
    }

    /// Second half: wait for network confirmation, then resolve the
    /// credential the submission step will present.
    pub async fn finish(
        &self,
        action: &PaymentAction,
        broadcast: BroadcastPayment,
        cancel: &CancelToken,
    ) -> Result<AuthorizedPayment, PaymentError> {
        let BroadcastPayment {
            transaction_signature,
            mut pending,
        } = broadcast;

        if cancel.is_cancelled() {
            return Err(PaymentError::Aborted);
        }

        match await_confirmation(
            self.chain.as_ref(),
            &transaction_signature,
            self.config.confirmation_timeout,
            self.config.confirmation_poll_interval,
        )
        .await
        {
            Ok(()) => pending.status = PaymentStatus::Confirmed,
            Err(e) => {
                pending.status = PaymentStatus::Failed;
                tracing::warn!(
                    action_id = %pending.action_id,
                    status = ?pending.status,
                    error = %e,
                    "payment not confirmed"
                );
                return Err(e);
            }
        }

        let credential = match pending.credential.take() {
            Some(cred) => cred,
            // No bundled token: fall back to the store, renewing if needed.
            None => match self.auth.store().get(&action.identity) {
                Some(cred) => cred,
                None => self.auth.refresh_credential(&action.identity).await?,
            },
        };

        tracing::info!(%transaction_signature, "payment confirmed");
        Ok(AuthorizedPayment {
            transaction_signature,
            action_id: pending.action_id,
            credential,
        })
    }

    /// Ask the server to build the unsigned transaction for `action`.
    ///
    /// If the response bundles a fresh token it is stored immediately, so the
    /// follow-up submission can use it even if this request authenticated
    /// through a different path.
    async fn construct(&self, action: &PaymentAction) -> Result<PendingPayment, PaymentError> {
        let mut body = serde_json::json!({
            "content": action.content,
            "walletAddress": action.identity.to_base58(),
            "challengeId": action.challenge_id.as_str(),
        });
        if let Some(pct) = self.config.treasury_split_pct {
            body["treasurySplitPct"] = serde_json::json!(pct);
        }

        let response = self
            .auth
            .execute(ApiRequest::post(PAYMENT_CONSTRUCT_PATH, body), &action.identity)
            .await?;
        if !response.is_success() {
            return Err(PaymentError::InvalidConstructResponse(format!(
                "status {}",
                response.status
            )));
        }

        let construct: ConstructResponse = response
            .json()
            .map_err(|e| PaymentError::InvalidConstructResponse(e.to_string()))?;

        let credential = construct.token.map(|token| {
            let cred = SessionCredential::new(token, action.identity);
            self.auth.store().put(cred.clone());
            cred
        });

        Ok(PendingPayment {
            unsigned_transaction: UnsignedTransaction::new(construct.unsigned_transaction),
            action_id: construct.action_id,
            credential,
            status: PaymentStatus::Pending,
        })
    }
}
