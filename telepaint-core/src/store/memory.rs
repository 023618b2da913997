//! In-process content store with the same optimistic-concurrency rules as
//! the hosted repository.
//!
//! Revisions are the hex SHA-256 of the stored bytes. Status codes follow
//! the GitHub contents API: 200 update, 201 create, 409 stale revision,
//! 422 missing revision for an existing object.

use crate::store::{AuthoritativeRead, ContentStore, Result, RevisionToken, StoreError, StoreResponse};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    revision: RevisionToken,
    message: String,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, StoredObject>,
    published_status: Option<u16>,
    writes: usize,
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn digest(content: &[u8]) -> RevisionToken {
    let hash = Sha256::digest(content);
    let hex: String = hash.iter().map(|b| format!("{:02x}", b)).collect();
    RevisionToken::new(hex)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Transport("memory store lock poisoned".to_string()))
    }

    /// Place content directly, as if another client had written it.
    pub fn put(&self, path: &str, content: impl Into<Vec<u8>>) -> RevisionToken {
        let content = content.into();
        let revision = digest(&content);
        if let Ok(mut inner) = self.lock() {
            inner.objects.insert(
                path.to_string(),
                StoredObject {
                    content,
                    revision: revision.clone(),
                    message: String::new(),
                },
            );
        }
        revision
    }

    /// Current content of an object
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .ok()
            .and_then(|inner| inner.objects.get(path).map(|o| o.content.clone()))
    }

    /// Current revision of an object
    pub fn revision(&self, path: &str) -> Option<RevisionToken> {
        self.lock()
            .ok()
            .and_then(|inner| inner.objects.get(path).map(|o| o.revision.clone()))
    }

    /// Commit message of the last write to an object
    pub fn last_message(&self, path: &str) -> Option<String> {
        self.lock()
            .ok()
            .and_then(|inner| inner.objects.get(path).map(|o| o.message.clone()))
    }

    /// Force every published read to answer with `status` and an empty
    /// body. `None` restores normal behavior.
    pub fn set_published_status(&self, status: Option<u16>) {
        if let Ok(mut inner) = self.lock() {
            inner.published_status = status;
        }
    }

    /// Number of write attempts, successful or not
    pub fn write_count(&self) -> usize {
        self.lock().map(|inner| inner.writes).unwrap_or(0)
    }
}

impl ContentStore for MemoryStore {
    fn read_authoritative(&self, path: &str) -> Result<AuthoritativeRead> {
        let inner = self.lock()?;
        Ok(match inner.objects.get(path) {
            Some(object) => AuthoritativeRead {
                status: 200,
                body: object.content.clone(),
                revision: Some(object.revision.clone()),
            },
            None => AuthoritativeRead {
                status: 404,
                body: Vec::new(),
                revision: None,
            },
        })
    }

    fn read_published(&self, path: &str, _cache_bust: bool) -> Result<StoreResponse> {
        let inner = self.lock()?;
        if let Some(status) = inner.published_status {
            return Ok(StoreResponse::new(status, Vec::new()));
        }
        Ok(match inner.objects.get(path) {
            Some(object) => StoreResponse::new(200, object.content.clone()),
            None => StoreResponse::new(404, Vec::new()),
        })
    }

    fn write(
        &self,
        path: &str,
        message: &str,
        content: &[u8],
        revision: Option<&RevisionToken>,
    ) -> Result<u16> {
        let mut inner = self.lock()?;
        inner.writes += 1;

        let status = match (inner.objects.get(path), revision) {
            (Some(current), Some(given)) if current.revision != *given => return Ok(409),
            (Some(_), None) => return Ok(422),
            (None, Some(_)) => return Ok(409),
            (Some(_), Some(_)) => 200,
            (None, None) => 201,
        };

        inner.objects.insert(
            path.to_string(),
            StoredObject {
                content: content.to_vec(),
                revision: digest(content),
                message: message.to_string(),
            },
        );
        Ok(status)
    }
}
