use thiserror::Error;

use jailpool_auth::TransportError;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("server could not match the payment to a valid, unconsumed transaction")]
    PaymentNotRecognized,

    #[error("reply stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("submission rejected with status {status}: {message}")]
    SubmissionRejected { status: u16, message: String },

    /// Transient poll failure. Recovered inside the poller loop, never
    /// surfaced to the user; the next tick supersedes it.
    #[error("challenge poll failed: {0}")]
    PollFailure(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
