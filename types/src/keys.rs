//! Cryptographic key types for wallet identity and signing.
//!
//! The platform addresses wallets by the base58 encoding of the Ed25519
//! public key, so [`PublicKey`] doubles as the identity type and
//! [`WalletAddress`] is its string form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors arising from key parsing.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

/// A 32-byte Ed25519 public key identifying a wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 private key (secret scalar).
///
/// This type intentionally does not implement `Debug`, `Serialize`, or `Clone`
/// to prevent accidental exposure. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// A 64-byte Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

/// An Ed25519 key pair (public + private).
///
/// Use `jailpool_crypto::generate_keypair()` or
/// `jailpool_crypto::keypair_from_seed()` to construct key pairs.
/// This struct is intentionally just data.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

/// A wallet address: the base58 string form of a [`PublicKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58 encoding used on the wire and in chat history entries.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Parse a public key from its base58 string form.
    pub fn from_base58(s: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            KeyError::InvalidLength {
                expected: 32,
                got: bytes.len(),
            }
        })?;
        Ok(Self(arr))
    }

    /// The address string for this public key.
    pub fn address(&self) -> WalletAddress {
        WalletAddress(self.to_base58())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base58 encoding used in auth headers and submission bodies.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Parse a signature from its base58 string form.
    pub fn from_base58(s: &str) -> Result<Self, KeyError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidBase58(e.to_string()))?;
        let arr: [u8; 64] = bytes.as_slice().try_into().map_err(|_| {
            KeyError::InvalidLength {
                expected: 64,
                got: bytes.len(),
            }
        })?;
        Ok(Self(arr))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

impl WalletAddress {
    /// Wrap a raw base58 address string (e.g. from a server response).
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this address is the string form of the given public key.
    pub fn belongs_to(&self, key: &PublicKey) -> bool {
        self.0 == key.to_base58()
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&PublicKey> for WalletAddress {
    fn from(key: &PublicKey) -> Self {
        key.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_round_trip() {
        let key = PublicKey([7u8; 32]);
        let parsed = PublicKey::from_base58(&key.to_base58()).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn signature_base58_round_trip() {
        let sig = Signature([0xAB; 64]);
        let parsed = Signature::from_base58(&sig.to_base58()).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn wrong_length_rejected() {
        // 16 bytes of valid base58 is not a public key
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(matches!(
            PublicKey::from_base58(&short),
            Err(KeyError::InvalidLength { expected: 32, got: 16 })
        ));
    }

    #[test]
    fn invalid_base58_rejected() {
        assert!(matches!(
            PublicKey::from_base58("not-base58-0OIl"),
            Err(KeyError::InvalidBase58(_))
        ));
    }

    #[test]
    fn address_belongs_to_its_key() {
        let key = PublicKey([3u8; 32]);
        let other = PublicKey([4u8; 32]);
        let addr = key.address();
        assert!(addr.belongs_to(&key));
        assert!(!addr.belongs_to(&other));
    }

    #[test]
    fn signature_serde_as_base58_string() {
        let sig = Signature([5u8; 64]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", sig.to_base58()));
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
