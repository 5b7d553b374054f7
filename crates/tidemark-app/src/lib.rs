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

//! Binary wiring for the sync daemon.
//!
//! Layout: `cli.rs` (argument parsing), `bootstrap.rs` (service
//! construction and the run loop), `error.rs` (top-level error taxonomy).

pub mod bootstrap;
pub mod cli;
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
