use thiserror::Error;

use jailpool_auth::AuthError;

use crate::chain::ChainError;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("wallet declined to sign the payment transaction")]
    SigningDeclined,

    #[error("transaction failed on the network: {0}")]
    TransactionFailed(String),

    #[error("transaction confirmation timed out")]
    ConfirmationTimeout,

    #[error("payment flow aborted (wallet disconnected)")]
    Aborted,

    #[error("transaction construction returned an invalid response: {0}")]
    InvalidConstructResponse(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
