//! Payment authorization for the jailpool pipeline.
//!
//! Every message is gated by an on-chain payment. The flow is strictly
//! sequential: ask the server to construct an unsigned transaction for the
//! action, have the wallet sign and broadcast it, wait (bounded) for network
//! confirmation, and only then hand the confirmed transaction id to the
//! submission step. Nothing is submitted speculatively.

pub mod chain;
pub mod error;
pub mod flow;
pub mod wallet;

pub use chain::{await_confirmation, ChainClient, ChainError, ConfirmationStatus};
pub use error::PaymentError;
pub use flow::{
    AuthorizedPayment, BroadcastPayment, CancelToken, PaymentAction, PaymentConfig, PaymentFlow,
    PaymentStatus, PendingPayment,
};
pub use wallet::{PaymentWallet, PaymentWalletError, TransactionSignature, UnsignedTransaction};
