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

//! Normalized domain model and collaborator contracts shared across the
//! workspace.
//!
//! Layout: `model` (torrent/file/settings DTOs and the speed-history sample),
//! `service` (traits implemented by the mirrored state store, the notifier,
//! the durable key-value store, and the wake-up scheduler).

pub mod model;
pub mod service;

pub use model::{
    BandwidthPriority, FilePriority, PeerSnapshot, SessionSettings, SpeedSample, Torrent,
    TorrentDetail, TorrentFile, TorrentStatus, TrackerStat,
};
pub use service::{CompletionNotifier, KeyValueStore, RefreshScheduler, StateStore};
