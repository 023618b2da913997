//! Background sync worker.
//!
//! The store calls block, so the loop runs on tokio's blocking pool. The
//! caller publishes its latest local document through a watch channel and
//! observes the peer document through another; dropping the local sender
//! (or calling [`SyncHandle::shutdown`]) ends the loop after the current
//! tick.

use super::engine::{SyncLoop, SyncSettings, SyncState};
use crate::document::Document;
use crate::store::{self, ContentStore};
use crate::{Result, TelepaintError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Handle to a running worker.
pub struct SyncHandle {
    local_tx: watch::Sender<Document>,
    peer_rx: watch::Receiver<Option<Document>>,
    task: JoinHandle<Result<SyncState>>,
}

impl SyncHandle {
    /// Replace the document the next commit will upload.
    pub fn publish_local(&self, document: Document) {
        self.local_tx.send_replace(document);
    }

    /// Last peer document the worker decoded.
    pub fn peer(&self) -> Option<Document> {
        self.peer_rx.borrow().clone()
    }

    /// Receiver that wakes whenever the peer document changes
    pub fn peer_updates(&self) -> watch::Receiver<Option<Document>> {
        self.peer_rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker and return its final state.
    pub async fn shutdown(self) -> Result<SyncState> {
        let Self { local_tx, task, .. } = self;
        drop(local_tx);
        task.await
            .map_err(|e| TelepaintError::Worker(e.to_string()))?
    }
}

pub struct SyncWorker;

impl SyncWorker {
    /// Start the loop on the blocking pool.
    ///
    /// `make_store` runs on the worker thread, so blocking clients can be
    /// built there. Must be called from within a tokio runtime.
    pub fn spawn<S, F>(
        make_store: F,
        settings: SyncSettings,
        tick: Duration,
        initial: Document,
    ) -> SyncHandle
    where
        S: ContentStore + 'static,
        F: FnOnce() -> store::Result<S> + Send + 'static,
    {
        let (local_tx, mut local_rx) = watch::channel(initial);
        let (peer_tx, peer_rx) = watch::channel(None);

        let task = tokio::task::spawn_blocking(move || -> Result<SyncState> {
            let store = make_store()?;
            let sync = SyncLoop::new(store, settings);
            let mut state = SyncState::new();
            info!("Sync worker started for {}", sync.settings().local_path);

            // Errors once every sender is gone
            while local_rx.has_changed().is_ok() {
                let local = local_rx.borrow_and_update().clone();

                let report = match sync.tick(&mut state, Instant::now(), &local) {
                    Ok(report) => report,
                    Err(e) if e.is_fatal() => {
                        error!("Sync worker stopping: {}", e);
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!("Tick failed: {}", e);
                        std::thread::sleep(tick);
                        continue;
                    }
                };

                if report.poll.map(|p| p.is_updated()).unwrap_or(false) {
                    peer_tx.send_replace(state.peer_document.clone());
                }
                if report.commit.is_some() || report.poll.is_some() {
                    debug!("Tick: {:?}", report);
                }

                std::thread::sleep(tick);
            }

            info!("Sync worker stopped");
            Ok(state)
        });

        SyncHandle {
            local_tx,
            peer_rx,
            task,
        }
    }
}
