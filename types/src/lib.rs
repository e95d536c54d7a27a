//! Fundamental types for the jailpool client pipeline.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: wallet keys and addresses, timestamps, session credentials,
//! challenge metadata, and conversation messages.

pub mod challenge;
pub mod credential;
pub mod keys;
pub mod message;
pub mod time;

pub use challenge::{ChallengeId, ChallengeName, ChallengeSnapshot, ChallengeStatus};
pub use credential::{SessionCredential, SignedAuthProof};
pub use keys::{KeyPair, KeyError, PrivateKey, PublicKey, Signature, WalletAddress};
pub use message::{ChatMessage, Role};
pub use time::Timestamp;
