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

//! Reference implementations of the sync core's collaborator contracts.
//!
//! Layout: `memory` (in-process mirrored store with the speed-history roll),
//! `kv` (JSON-file durable key-value map), `schedule` (tokio-interval
//! adapter for the wake-up scheduler contract).

pub mod kv;
pub mod memory;
pub mod schedule;

pub use kv::JsonFileKv;
pub use memory::{MemoryStateStore, SPEED_RETENTION_SECS};
pub use schedule::{TickHandler, TokioScheduler};
