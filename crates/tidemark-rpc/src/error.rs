//! Error taxonomy for the transport layer.

use std::error::Error;

use thiserror::Error;

/// Failure classes surfaced by the transport.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The connection could not be established or completed. Retried with
    /// backoff before being surfaced.
    #[error("network failure reaching the daemon")]
    Network {
        /// Underlying I/O failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The daemon answered with a non-success HTTP status. Never retried,
    /// except for the stale-token conflict handled inside the client.
    #[error("daemon returned HTTP {status}: {reason}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Status reason text.
        reason: String,
    },
    /// The daemon processed the call but reported a non-success result.
    /// Never retried.
    #[error("daemon rejected the call: {message}")]
    Remote {
        /// The server's literal result string.
        message: String,
    },
    /// The response body could not be parsed, even after the repair pass.
    #[error("response body is not valid JSON")]
    Parse {
        /// The strict parser's failure.
        #[source]
        source: serde_json::Error,
    },
}

impl RpcError {
    /// Wrap an I/O-level failure as a network error.
    pub fn network(source: impl Error + Send + Sync + 'static) -> Self {
        Self::Network {
            source: Box::new(source),
        }
    }
}

/// Convenience alias for transport results.
pub type RpcResult<T> = Result<T, RpcError>;
