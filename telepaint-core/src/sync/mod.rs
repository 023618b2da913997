//! Frame synchronization between two peers.
//!
//! - Commit channel: at most once per `commit_min_interval`, upload the
//!   local document with a revision-conditioned write
//! - Poll channel: once per `poll_interval`, fetch the peer's published
//!   document and keep the last one that decoded cleanly
//!
//! No merging happens. Each peer owns exactly one object and the two
//! documents are only ever composited for display.

pub mod engine;
pub mod worker;


pub use engine::{CommitOutcome, PollOutcome, SyncLoop, SyncSettings, SyncState, TickReport};
pub use worker::{SyncHandle, SyncWorker};
