//! Telepaint core library
//!
//! Two peers exchange drawing frames through a shared content store.
//! Each peer owns one object, commits it on a throttle with an optimistic
//! revision check, and polls the other peer's published copy. Frames may
//! be sealed in a passphrase-derived AES-256-GCM envelope.

pub mod config;
pub mod crypto;
pub mod document;
pub mod envelope;
pub mod platform;
pub mod store;
pub mod sync;

pub use config::{ConfigError, TelepaintConfig};
pub use crypto::{CryptoError, KdfParams, Passphrase, DEFAULT_PBKDF2_ITERATIONS};
pub use document::{parse_document, Document, ParseError, ParsedDocument, Point, Stroke};
pub use envelope::{seal, EnvelopeRecord};
pub use platform::{default_config_path, get_config_dir};
pub use store::{ContentStore, MemoryStore, RevisionToken, StoreError};
#[cfg(feature = "http")]
pub use store::{GitHubStore, GitHubStoreConfig};
pub use sync::{
    CommitOutcome, PollOutcome, SyncHandle, SyncLoop, SyncSettings, SyncState, SyncWorker,
    TickReport,
};

use thiserror::Error;

/// Result type for telepaint operations
pub type Result<T> = std::result::Result<T, TelepaintError>;

/// General error type for telepaint operations
#[derive(Error, Debug)]
pub enum TelepaintError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Document error: {0}")]
    Parse(#[from] document::ParseError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Sync worker failed: {0}")]
    Worker(String),
}
