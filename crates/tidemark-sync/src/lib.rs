#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Sync engine and polling daemon mirroring a remote BitTorrent daemon.
//!
//! Layout: `engine` (the service object and mutate-then-refresh policy),
//! `torrents` (refresh, reconciliation, completion detection, actions),
//! `files` (file listing and priority fan-out), `settings` (session
//! settings and single-purpose calls), `normalize` (wire-to-model
//! translation), `daemon` (restart-safe periodic scheduling).

pub mod daemon;
pub mod engine;
pub mod error;
mod files;
pub mod normalize;
mod settings;
mod torrents;

pub use daemon::{PollDaemon, REFRESH_SCHEDULE, Refresher};
pub use engine::{EngineOptions, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use torrents::{AddOutcome, AddTorrentRequest, QueueMove};
