use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no wallet connected for the requested identity")]
    IdentityUnavailable,

    #[error("signing prompt declined by user")]
    UserRejected,

    #[error("credential exchange exhausted: server rejected the retried request")]
    Unauthenticated,

    #[error("token exchange returned an invalid response: {0}")]
    InvalidTokenResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
