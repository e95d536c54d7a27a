//! Wallet authentication for the jailpool pipeline.
//!
//! Three pieces, layered:
//! - [`IdentityProver`] turns a wallet's ability to sign into a one-shot
//!   [`SignedAuthProof`](jailpool_types::SignedAuthProof);
//! - [`CredentialStore`] caches the session credential obtained from a proof,
//!   scoped to the identity that earned it;
//! - [`AuthClient`] orchestrates "reuse cached credential, re-prove once on
//!   rejection" for every outbound call.
//!
//! All network I/O goes through the [`Transport`] trait so the retry
//! discipline is testable without HTTP.

pub mod client;
pub mod credential_store;
pub mod error;
pub mod prover;
pub mod transport;

pub use client::AuthClient;
pub use credential_store::CredentialStore;
pub use error::AuthError;
pub use prover::{IdentityProver, LocalSigner, SignerError, WalletSigner};
pub use transport::{
    ApiRequest, ApiResponse, Method, ReplyStream, RequestAuth, Transport, TransportError,
};
