//! Top-level error taxonomy for the binary.

use thiserror::Error;
use tidemark_sync::SyncError;

/// Failures that abort the daemon.
#[derive(Debug, Error)]
pub enum AppError {
    /// A command-line value could not be used.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// The tracing subscriber could not be installed.
    #[error("telemetry setup failed")]
    Telemetry {
        /// Underlying setup failure.
        #[source]
        source: anyhow::Error,
    },
    /// A sync operation failed during startup.
    #[error("sync failure")]
    Sync {
        /// Underlying sync failure.
        #[from]
        source: SyncError,
    },
    /// The refresh schedule could not be armed or the run loop broke.
    #[error("scheduler failure")]
    Scheduler {
        /// Underlying scheduler failure.
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias for binary results.
pub type AppResult<T> = Result<T, AppError>;
