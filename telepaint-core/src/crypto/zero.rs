//! Zeroizing holder for the shared passphrase.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The passphrase both peers were given out of band.
///
/// The bytes are wiped when the value is dropped, and `Debug` never
/// prints them, so a passphrase can sit inside config structs that get
/// logged.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase {
    data: Vec<u8>,
}

impl Passphrase {
    /// Wrap raw passphrase bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Take ownership of a string passphrase
    pub fn from_string(s: String) -> Self {
        Self {
            data: s.into_bytes(),
        }
    }

    /// An empty passphrase means "plaintext mode" in the config file.
    pub fn non_empty(s: String) -> Option<Self> {
        if s.is_empty() {
            None
        } else {
            Some(Self::from_string(s))
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the inner bytes (use carefully!)
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<[u8]> for Passphrase {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_from_str() {
        let passphrase = Passphrase::from("hunter2");
        assert_eq!(passphrase.len(), 7);
        assert_eq!(passphrase.as_bytes(), b"hunter2");
    }

    #[test]
    fn test_debug_is_redacted() {
        let passphrase = Passphrase::from("hunter2");
        let printed = format!("{:?}", passphrase);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_non_empty() {
        assert!(Passphrase::non_empty(String::new()).is_none());
        let p = Passphrase::non_empty("x".to_string()).unwrap();
        assert!(!p.is_empty());
    }

    #[test]
    fn test_zeroize_clears_bytes() {
        let mut passphrase = Passphrase::from("secret");
        passphrase.zeroize();
        assert!(passphrase.is_empty());
    }
}
