//! Envelope wire record: `{"v":1,"alg":..,"salt":..,"iv":..,"ct":..}`.
//!
//! The record keeps its fields as base64 text. Classification only checks
//! that the four keys exist; decoding the base64 is deferred until the
//! caller actually tries to decrypt, and any failure there is reported as
//! an ordinary decryption failure.

use crate::crypto::{self, CryptoError, Envelope, Passphrase, ENVELOPE_ALGORITHM, ENVELOPE_VERSION};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON shape of an envelope as stored in the content repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    pub v: u32,
    pub alg: String,
    pub salt: String,
    pub iv: String,
    pub ct: String,
}

impl From<&Envelope> for EnvelopeRecord {
    fn from(envelope: &Envelope) -> Self {
        Self {
            v: envelope.version,
            alg: envelope.algorithm.clone(),
            salt: STANDARD.encode(&envelope.salt),
            iv: STANDARD.encode(&envelope.iv),
            ct: STANDARD.encode(&envelope.ciphertext_and_tag),
        }
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl EnvelopeRecord {
    /// Serialize to the compact JSON wire form.
    pub fn to_json(&self) -> Vec<u8> {
        // A struct of strings and an integer cannot fail to serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Classify a response body.
    ///
    /// Returns `None` when the body is not a JSON object or lacks any of
    /// `alg`, `salt`, `iv`, `ct`. This is not a validating parser: a
    /// record with garbage base64 is still an envelope.
    pub fn try_parse(bytes: &[u8]) -> Option<Self> {
        let root: Value = serde_json::from_slice(bytes).ok()?;
        let obj = root.as_object()?;

        let alg = obj.get("alg")?;
        let salt = obj.get("salt")?;
        let iv = obj.get("iv")?;
        let ct = obj.get("ct")?;

        // Absent means version 1; anything unreadable becomes 0, which no
        // decoder accepts.
        let v = match obj.get("v") {
            None => ENVELOPE_VERSION,
            Some(v) => v
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0),
        };

        Some(Self {
            v,
            alg: field_text(alg),
            salt: field_text(salt),
            iv: field_text(iv),
            ct: field_text(ct),
        })
    }

    /// Decode the base64 fields into an [`Envelope`].
    ///
    /// An unsupported `v` or `alg` and malformed base64 all yield
    /// `CryptoError::Decrypt`, the same error a tampered envelope produces.
    pub fn decode(&self) -> Result<Envelope, CryptoError> {
        if self.v != ENVELOPE_VERSION || self.alg != ENVELOPE_ALGORITHM {
            return Err(CryptoError::Decrypt);
        }
        let decode = |field: &str| STANDARD.decode(field).map_err(|_| CryptoError::Decrypt);

        Ok(Envelope {
            version: self.v,
            algorithm: self.alg.clone(),
            salt: decode(&self.salt)?,
            iv: decode(&self.iv)?,
            ciphertext_and_tag: decode(&self.ct)?,
        })
    }

    /// Decode and decrypt in one step.
    pub fn open(&self, passphrase: &Passphrase, iterations: u32) -> Result<Vec<u8>, CryptoError> {
        let envelope = self.decode()?;
        crypto::decrypt(&envelope, passphrase, iterations)
    }
}

/// Encrypt `plaintext` and return the wire JSON of the resulting envelope.
pub fn seal(plaintext: &[u8], passphrase: &Passphrase, iterations: u32) -> Result<Vec<u8>, CryptoError> {
    let envelope = crypto::encrypt(plaintext, passphrase, iterations)?;
    Ok(EnvelopeRecord::from(&envelope).to_json())
}
