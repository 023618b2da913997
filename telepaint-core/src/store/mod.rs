//! Content store client: the three operations the sync loop needs from the
//! remote repository.
//!
//! - an authenticated read that also yields the object's revision token
//! - an unauthenticated read of the published (mirrored) copy
//! - an authenticated conditional write
//!
//! HTTP statuses are returned as data; only transport-level failures are
//! errors. The caller decides what a non-2xx status means.

#[cfg(feature = "http")]
pub mod github;
pub mod memory;

#[cfg(feature = "http")]
pub use github::{GitHubStore, GitHubStoreConfig};
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors from the content store transport
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Opaque identifier of an object's current state (a content digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status and body of a store read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl StoreResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

/// Result of an authenticated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritativeRead {
    pub status: u16,
    pub body: Vec<u8>,
    /// Present only when the object exists and the store reported it
    pub revision: Option<RevisionToken>,
}

/// Whether an HTTP status counts as a successful write or read
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Remote blob store with optimistic concurrency.
///
/// Implementations block the calling thread for the duration of a call.
pub trait ContentStore: Send {
    /// Authenticated read of the canonical object. Used to obtain the
    /// revision token right before a write, never for polling.
    fn read_authoritative(&self, path: &str) -> Result<AuthoritativeRead>;

    /// Unauthenticated read of the public mirror. With `cache_bust` the
    /// request carries a unique query parameter so intermediate caches
    /// cannot answer with a stale copy.
    fn read_published(&self, path: &str, cache_bust: bool) -> Result<StoreResponse>;

    /// Conditional write. With a revision the store must reject the write
    /// unless it matches the object's current revision; without one the
    /// write means "create if absent". Returns the HTTP status.
    fn write(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        revision: Option<&RevisionToken>,
    ) -> Result<u16>;
}

impl<S: ContentStore + Sync> ContentStore for std::sync::Arc<S> {
    fn read_authoritative(&self, path: &str) -> Result<AuthoritativeRead> {
        (**self).read_authoritative(path)
    }

    fn read_published(&self, path: &str, cache_bust: bool) -> Result<StoreResponse> {
        (**self).read_published(path, cache_bust)
    }

    fn write(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        revision: Option<&RevisionToken>,
    ) -> Result<u16> {
        (**self).write(path, message, content, revision)
    }
}
