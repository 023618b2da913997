//! Cryptographic primitives for frame envelopes.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation from a shared passphrase
//! - AES-256-GCM encryption/decryption into an [`Envelope`]
//! - Zeroizing holders for passphrases and derived keys

pub mod cipher;
pub mod kdf;
pub mod zero;

pub use cipher::{decrypt, encrypt, Envelope, ENVELOPE_ALGORITHM, ENVELOPE_VERSION};
pub use kdf::{derive_key, EnvelopeKey, KdfParams, DEFAULT_PBKDF2_ITERATIONS};
pub use zero::Passphrase;

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS random source could not produce salt or IV bytes. Fatal.
    #[error("Random number generation failed: {0}")]
    EntropyFailure(String),

    /// Wrong passphrase, tampering, truncation and malformed fields all
    /// collapse into this variant so callers cannot tell them apart.
    #[error("Decryption failed")]
    Decrypt,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

impl CryptoError {
    /// Whether the process can keep running after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decrypt)
    }
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decryption_failures_are_recoverable() {
        assert!(!CryptoError::Decrypt.is_fatal());
        assert!(CryptoError::EntropyFailure("os".to_string()).is_fatal());
        assert!(CryptoError::Encryption("aead".to_string()).is_fatal());
        assert!(CryptoError::KeyDerivation("rounds".to_string()).is_fatal());
    }
}
