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

//! Shared test helpers used across the workspace's suites.
//! Layout: http.rs (scripted transport seam), fakes.rs (recording
//! collaborator fakes), fixtures.rs (wire-record builders).

pub mod fakes;
pub mod fixtures;
pub mod http;

pub use fakes::{ManualScheduler, MemoryKv, NotifierEvent, RecordingNotifier};
pub use fixtures::{arguments, torrent_record, tracker_stat};
pub use http::{RecordedAttempt, ScriptedHttp, ScriptedReply};
