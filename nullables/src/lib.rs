//! Nullable infrastructure for deterministic testing.
//!
//! The pipeline's external dependencies (HTTP transport, wallet signing,
//! chain queries) are abstracted behind traits. This crate provides
//! test-friendly implementations that:
//! - Return scripted values in order
//! - Record every call for assertions
//! - Never touch the network or a real wallet
//!
//! Usage: swap real implementations for nullables in tests.

pub mod chain;
pub mod transport;
pub mod wallet;

pub use chain::NullChainClient;
pub use transport::{NullReplyStream, NullTransport, RecordedRequest, StreamGate};
pub use wallet::{NullPaymentWallet, NullWalletSigner};
