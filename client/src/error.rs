use thiserror::Error;

use jailpool_auth::AuthError;
use jailpool_conversation::ConversationError;
use jailpool_payment::PaymentError;

use crate::session::MessageLifecycle;

/// Top-level client errors: configuration problems, session misuse, and
/// everything the pipeline layers report.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("challenge state not loaded yet")]
    ChallengeUnknown,

    #[error("challenge is not accepting messages")]
    ChallengeClosed,

    #[error("invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: MessageLifecycle,
        to: MessageLifecycle,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}
