//! Error types for the sync engine.

use thiserror::Error;
use tidemark_rpc::RpcError;

/// Failures surfaced by the sync engine's public methods.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The underlying RPC call failed; carries the transport's
    /// classification.
    #[error("rpc call failed")]
    Rpc {
        /// Transport failure.
        #[from]
        source: RpcError,
    },
    /// The mirrored state store rejected an operation.
    #[error("state store operation failed")]
    Store {
        /// Store failure.
        #[source]
        source: anyhow::Error,
    },
    /// The durable key-value store rejected an operation.
    #[error("durable storage operation failed")]
    Storage {
        /// Storage failure.
        #[source]
        source: anyhow::Error,
    },
    /// A response was syntactically valid JSON but missing required shape.
    #[error("malformed response: {detail}")]
    Wire {
        /// What was missing or mis-typed.
        detail: String,
    },
}

impl SyncError {
    pub(crate) fn store(source: anyhow::Error) -> Self {
        Self::Store { source }
    }

    pub(crate) fn storage(source: anyhow::Error) -> Self {
        Self::Storage { source }
    }

    pub(crate) fn wire(detail: impl Into<String>) -> Self {
        Self::Wire {
            detail: detail.into(),
        }
    }
}

/// Convenience alias for sync results.
pub type SyncResult<T> = Result<T, SyncError>;
