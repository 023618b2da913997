//! AES-256-GCM envelope encryption and decryption.
//!
//! Uses AES-256-GCM with:
//! - 256-bit key derived via PBKDF2 (see [`crate::crypto::kdf`])
//! - 96-bit (12 byte) IV, fresh per envelope
//! - 128-bit authentication tag appended to the ciphertext
//! - 128-bit salt, fresh per envelope

use crate::crypto::kdf::{derive_key, SALT_LEN};
use crate::crypto::{CryptoError, Passphrase, Result};
use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

/// Envelope format version written by this implementation
pub const ENVELOPE_VERSION: u32 = 1;

/// Algorithm tag written into every envelope
pub const ENVELOPE_ALGORITHM: &str = "AES-256-GCM";

/// IV length in bytes
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// An encrypted document together with everything needed to decrypt it,
/// except the passphrase and the iteration count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: u32,
    pub algorithm: String,
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    /// `ciphertext || tag(16)`
    pub ciphertext_and_tag: Vec<u8>,
}

fn fill_random(buf: &mut [u8], what: &str) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::EntropyFailure(format!("{}: {}", what, e)))
}

/// Encrypt a byte string under a passphrase
///
/// Each call draws one fresh salt and one fresh IV from the OS random
/// source, so two envelopes of the same plaintext never share either.
///
/// # Errors
/// `CryptoError::EntropyFailure` if the random source fails. There is no
/// safe fallback, callers should abort.
pub fn encrypt(plaintext: &[u8], passphrase: &Passphrase, iterations: u32) -> Result<Envelope> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    fill_random(&mut salt, "salt")?;
    fill_random(&mut iv, "iv")?;

    let key = derive_key(passphrase.as_bytes(), &salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    // aes-gcm appends the tag to the ciphertext
    let ciphertext_and_tag = cipher
        .encrypt(&Nonce::from(iv), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(Envelope {
        version: ENVELOPE_VERSION,
        algorithm: ENVELOPE_ALGORITHM.to_string(),
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        ciphertext_and_tag,
    })
}

/// Decrypt an envelope with the shared passphrase
///
/// # Security
/// - An unknown version or algorithm, an IV that is not 12 bytes, a body
///   shorter than the tag and a failed tag check all return the same
///   `CryptoError::Decrypt`. A wrong passphrase is indistinguishable from
///   corruption.
/// - No plaintext is returned unless the tag verifies.
pub fn decrypt(envelope: &Envelope, passphrase: &Passphrase, iterations: u32) -> Result<Vec<u8>> {
    if envelope.version != ENVELOPE_VERSION || envelope.algorithm != ENVELOPE_ALGORITHM {
        return Err(CryptoError::Decrypt);
    }
    if envelope.iv.len() != IV_LEN {
        return Err(CryptoError::Decrypt);
    }
    if envelope.ciphertext_and_tag.len() < TAG_LEN {
        return Err(CryptoError::Decrypt);
    }

    let key = derive_key(passphrase.as_bytes(), &envelope.salt, iterations)?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(
            Nonce::from_slice(&envelope.iv),
            envelope.ciphertext_and_tag.as_slice(),
        )
        .map_err(|_| CryptoError::Decrypt)
}
