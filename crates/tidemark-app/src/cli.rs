//! Command-line arguments for the sync daemon.

use std::path::PathBuf;

use clap::Parser;

/// Mirror and remote-control a BitTorrent daemon over its RPC endpoint.
#[derive(Debug, Parser)]
#[command(name = "tidemark", version, about)]
pub struct Cli {
    /// RPC endpoint URL of the daemon.
    #[arg(
        long,
        env = "TIDEMARK_URL",
        default_value = "http://127.0.0.1:9091/transmission/rpc"
    )]
    pub url: String,

    /// Account login for daemons with authentication enabled.
    #[arg(long, env = "TIDEMARK_USERNAME")]
    pub username: Option<String>,

    /// Account password; ignored without a login.
    #[arg(long, env = "TIDEMARK_PASSWORD")]
    pub password: Option<String>,

    /// Polling interval in milliseconds; values below 1000 disable polling.
    #[arg(long, env = "TIDEMARK_POLL_INTERVAL_MS", default_value_t = 60_000)]
    pub poll_interval_ms: u64,

    /// Suppress completion notifications.
    #[arg(long)]
    pub no_notify: bool,

    /// Path of the durable state file.
    #[arg(long, env = "TIDEMARK_STATE_FILE", default_value = "tidemark-state.json")]
    pub state_file: PathBuf,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, default_value = tidemark_telemetry::DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Log output format: `json` or `pretty`.
    #[arg(long)]
    pub log_format: Option<String>,
}
