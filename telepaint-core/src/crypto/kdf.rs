//! PBKDF2-HMAC-SHA256 key derivation for envelope keys.
//!
//! Parameters:
//! - PRF: HMAC-SHA256
//! - Iterations: shared configuration, 200,000 by default
//! - Salt length: 16 bytes (fresh per envelope)
//! - Output length: 32 bytes (256 bits)
//!
//! The iteration count is not carried inside an envelope. Both peers must
//! be configured with the same value or every decryption fails.

use crate::crypto::{CryptoError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

/// Iteration count used by every known telepaint client.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes
pub const KEY_LEN: usize = 32;

/// Shared key-derivation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 rounds
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Verify that parameters are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        if self.iterations < 1 {
            return Err(CryptoError::KeyDerivation(
                "Iteration count too low (minimum: 1)".to_string(),
            ));
        }
        Ok(())
    }
}

/// A 256-bit AES key derived from the passphrase. Wiped on drop.
pub struct EnvelopeKey {
    key: [u8; KEY_LEN],
}

impl EnvelopeKey {
    /// Get the raw key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl Drop for EnvelopeKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive an envelope key from a passphrase and salt.
///
/// # Arguments
/// * `passphrase` - The shared passphrase as bytes
/// * `salt` - Salt stored in the envelope; any length is accepted on the
///   decrypt side, new envelopes always use 16 bytes
/// * `iterations` - PBKDF2 round count
pub fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> Result<EnvelopeKey> {
    KdfParams::new(iterations).validate()?;

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key);

    Ok(EnvelopeKey { key })
}
