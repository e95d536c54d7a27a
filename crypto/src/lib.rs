//! Cryptographic primitives for the jailpool client.
//!
//! - **Ed25519** for wallet identity proofs (signing the auth challenge)
//! - Key generation from a secure random source or a fixed seed
//!   (deterministic tests)

pub mod keys;
pub mod sign;

pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
