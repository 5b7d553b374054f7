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

//! Transport layer for the daemon's JSON-over-HTTP RPC endpoint.
//!
//! Owns the session token, the protocol-version key-casing dialect, the
//! retry/backoff policy for unreliable networks, and the repair pass for
//! responses the daemon emits with unescaped control characters. Callers
//! above this crate see one `call` that either commits or fails with a
//! classified [`RpcError`].

pub mod casing;
pub mod client;
pub mod error;
pub mod http;
pub mod repair;
#[cfg(test)]
mod scripted;

pub use casing::SNAKE_CASE_RPC_VERSION;
pub use client::{BodyParser, NullEvents, RpcClient, TransportEvents};
pub use error::{RpcError, RpcResult};
pub use http::{Credentials, HttpReply, HttpRequest, ReqwestHttp, RpcHttp, SESSION_TOKEN_HEADER};
