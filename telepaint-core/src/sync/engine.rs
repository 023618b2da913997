//! Sync loop: drives the commit and poll channels from a caller's tick.
//!
//! Both channels are periodic and independent. Each tick checks whether
//! either interval has elapsed and, if so, runs that channel once with
//! blocking store calls. Failures never retry inside the same tick; the
//! channel simply waits for its next interval.

use crate::crypto::{self, CryptoError, Passphrase};
use crate::document::{parse_document, Document, ParsedDocument};
use crate::envelope::{self, EnvelopeRecord};
use crate::store::{is_success, ContentStore};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything the loop needs to know about this peer and its partner.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Object this client writes
    pub local_path: String,
    /// Object the partner writes
    pub peer_path: String,
    /// `None` means plaintext mode
    pub passphrase: Option<Passphrase>,
    /// PBKDF2 rounds shared by both peers
    pub iterations: u32,
    pub poll_interval: Duration,
    pub commit_min_interval: Duration,
    pub commit_message: String,
}

/// Timing state and the last good peer document.
///
/// Owned by whoever calls [`SyncLoop::tick`]; nothing else touches it.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub last_commit_at: Option<Instant>,
    pub last_poll_at: Option<Instant>,
    /// Last successfully decoded remote document. Survives failed polls.
    pub peer_document: Option<Document>,
}

fn due(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= interval,
    }
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit_due(&self, now: Instant, interval: Duration) -> bool {
        due(self.last_commit_at, now, interval)
    }

    pub fn poll_due(&self, now: Instant, interval: Duration) -> bool {
        due(self.last_poll_at, now, interval)
    }
}

/// What a commit attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The store accepted the write (2xx)
    Written { status: u16 },
    /// The store answered with a non-2xx status, e.g. 409 on a stale revision
    Rejected { status: u16 },
    /// The request never produced a status
    TransportFailed,
}

/// What a poll attempt did to the cached peer document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Peer document replaced
    Updated {
        skipped_points: usize,
        skipped_strokes: usize,
    },
    /// Published read answered with something other than 200
    NotPublished { status: u16 },
    /// Peer writes envelopes but no passphrase is configured here
    EncryptedWithoutPassphrase,
    DecryptFailed,
    ParseFailed,
    TransportFailed,
    /// No peer path configured
    NoPeer,
}

impl PollOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// Which channels ran during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub commit: Option<CommitOutcome>,
    pub poll: Option<PollOutcome>,
}

/// The synchronization loop for one local/peer pair.
pub struct SyncLoop<S> {
    store: S,
    settings: SyncSettings,
}

impl<S: ContentStore> SyncLoop<S> {
    pub fn new(store: S, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run whichever channels are due at `now`.
    ///
    /// Both timestamps advance whenever their channel runs, regardless of
    /// outcome. Only an encryption failure is returned as an error; it
    /// means no safe envelope can be produced and the caller should stop.
    pub fn tick(
        &self,
        state: &mut SyncState,
        now: Instant,
        local: &Document,
    ) -> crypto::Result<TickReport> {
        let mut report = TickReport::default();

        if state.commit_due(now, self.settings.commit_min_interval) && !local.is_empty() {
            state.last_commit_at = Some(now);
            report.commit = Some(self.commit_now(local)?);
        }

        if state.poll_due(now, self.settings.poll_interval) {
            report.poll = Some(self.poll_now(state));
            state.last_poll_at = Some(now);
        }

        Ok(report)
    }

    /// Serialize the local document, wrapping it in an envelope when a
    /// passphrase is configured.
    pub fn encode_local(&self, local: &Document) -> crypto::Result<Vec<u8>> {
        let plain = local.to_json();
        match &self.settings.passphrase {
            Some(passphrase) => envelope::seal(&plain, passphrase, self.settings.iterations),
            None => Ok(plain),
        }
    }

    /// One commit attempt: read the current revision, then write
    /// conditionally. Never retried here.
    pub fn commit_now(&self, local: &Document) -> crypto::Result<CommitOutcome> {
        let path = self.settings.local_path.as_str();
        let payload = self.encode_local(local)?;

        let revision = match self.store.read_authoritative(path) {
            Ok(read) if read.status == 200 => read.revision,
            Ok(read) => {
                debug!("No current revision for {} (HTTP {}), creating", path, read.status);
                None
            }
            Err(e) => {
                warn!("Revision lookup for {} failed: {}", path, e);
                return Ok(CommitOutcome::TransportFailed);
            }
        };

        match self
            .store
            .write(path, &self.settings.commit_message, &payload, revision.as_ref())
        {
            Ok(status) if is_success(status) => {
                info!(
                    "Committed {} ({} strokes, HTTP {})",
                    path,
                    local.strokes.len(),
                    status
                );
                Ok(CommitOutcome::Written { status })
            }
            Ok(status) => {
                warn!("Upload of {} failed: HTTP {}", path, status);
                Ok(CommitOutcome::Rejected { status })
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", path, e);
                Ok(CommitOutcome::TransportFailed)
            }
        }
    }

    /// One poll attempt. Replaces `state.peer_document` only when a fresh
    /// document was fully decoded; every failure leaves it untouched.
    pub fn poll_now(&self, state: &mut SyncState) -> PollOutcome {
        let path = self.settings.peer_path.as_str();
        if path.is_empty() {
            debug!("No peer file configured, skipping poll");
            return PollOutcome::NoPeer;
        }

        let response = match self.store.read_published(path, true) {
            Ok(response) => response,
            Err(e) => {
                warn!("Peer poll of {} failed: {}", path, e);
                return PollOutcome::TransportFailed;
            }
        };

        if response.status != 200 {
            debug!("Peer poll of {}: HTTP {}", path, response.status);
            return PollOutcome::NotPublished {
                status: response.status,
            };
        }

        match self.decode_peer(path, &response.body) {
            Ok(parsed) => {
                if !parsed.is_clean() {
                    warn!(
                        "Peer document {} had {} malformed points and {} malformed strokes",
                        path, parsed.skipped_points, parsed.skipped_strokes
                    );
                }
                let outcome = PollOutcome::Updated {
                    skipped_points: parsed.skipped_points,
                    skipped_strokes: parsed.skipped_strokes,
                };
                debug!(
                    "Peer document {} updated ({} strokes)",
                    path,
                    parsed.document.strokes.len()
                );
                state.peer_document = Some(parsed.document);
                outcome
            }
            Err(outcome) => outcome,
        }
    }

    fn decode_peer(&self, path: &str, body: &[u8]) -> Result<ParsedDocument, PollOutcome> {
        let plain = match EnvelopeRecord::try_parse(body) {
            Some(record) => {
                let Some(passphrase) = &self.settings.passphrase else {
                    warn!("Peer document {} is encrypted; set a passphrase to view it", path);
                    return Err(PollOutcome::EncryptedWithoutPassphrase);
                };
                match record.open(passphrase, self.settings.iterations) {
                    Ok(plain) => plain,
                    Err(CryptoError::Decrypt) => {
                        warn!("Peer document {} could not be decrypted", path);
                        return Err(PollOutcome::DecryptFailed);
                    }
                    Err(e) => {
                        warn!("Peer document {} could not be decrypted: {}", path, e);
                        return Err(PollOutcome::DecryptFailed);
                    }
                }
            }
            None => body.to_vec(),
        };

        parse_document(&plain).map_err(|e| {
            warn!("Peer document {} rejected: {}", path, e);
            PollOutcome::ParseFailed
        })
    }
}
