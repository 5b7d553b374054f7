//! Construction and wiring of the long-lived services.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser as _;
use tidemark_core::{CompletionNotifier, RefreshScheduler, Torrent};
use tidemark_rpc::{Credentials, ReqwestHttp, RpcClient, TransportEvents};
use tidemark_store::{JsonFileKv, MemoryStateStore, TickHandler, TokioScheduler};
use tidemark_sync::{EngineOptions, PollDaemon, REFRESH_SCHEDULE, Refresher, SyncEngine};
use tidemark_telemetry::{LogFormat, LoggingConfig};
use tracing::{info, warn};
use url::Url;

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

/// Notifier that reports lifecycle events through the structured log.
struct LogNotifier;

#[async_trait]
impl CompletionNotifier for LogNotifier {
    async fn torrent_completed(&self, torrent: &Torrent) {
        info!(id = torrent.id, name = %torrent.name, "download complete");
    }

    async fn duplicate_torrent(&self, name: &str) {
        warn!(name, "torrent already present on the daemon");
    }

    async fn error(&self, message: &str) {
        warn!(message, "daemon reported an error");
    }
}

/// Routes schedule wake-ups to the poll daemon.
struct DaemonTicks {
    daemon: Arc<PollDaemon>,
}

#[async_trait]
impl TickHandler for DaemonTicks {
    async fn tick(&self, name: &str) {
        if name == REFRESH_SCHEDULE {
            self.daemon.on_tick().await;
        }
    }
}

/// Starts polling on the first successful exchange with the daemon.
#[derive(Default)]
struct LazyStart {
    daemon: Mutex<Option<Arc<PollDaemon>>>,
    started: AtomicBool,
}

impl LazyStart {
    fn install(&self, daemon: Arc<PollDaemon>) {
        *lock(&self.daemon) = Some(daemon);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TransportEvents for LazyStart {
    async fn connected(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let daemon = lock(&self.daemon).clone();
        if let Some(daemon) = daemon
            && let Err(err) = daemon.start().await
        {
            warn!(error = %err, "failed to start polling");
        }
    }

    async fn token_refreshed(&self, _token: &str) {
        info!("session token renewed");
    }
}

fn credentials_from(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    username.map(|login| Credentials {
        login,
        password: password.unwrap_or_default(),
    })
}

/// Parse the command line, wire every service and poll until shutdown.
///
/// # Errors
///
/// Returns an error when configuration is unusable, the first exchange with
/// the daemon fails, or the refresh schedule cannot be armed.
pub async fn run_app() -> AppResult<()> {
    let cli = Cli::parse();
    Box::pin(run_app_with(cli)).await
}

pub(crate) async fn run_app_with(cli: Cli) -> AppResult<()> {
    let format = cli
        .log_format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::parse);
    tidemark_telemetry::init_logging(&LoggingConfig {
        level: &cli.log_level,
        format,
        build_sha: env!("CARGO_PKG_VERSION"),
    })
    .map_err(|source| AppError::Telemetry { source })?;

    let endpoint: Url = cli.url.parse().map_err(|err| AppError::InvalidConfig {
        field: "url",
        reason: format!("{err}"),
    })?;
    let http = ReqwestHttp::new(endpoint, Duration::from_secs(cli.timeout_secs))
        .map_err(|err| AppError::Sync { source: err.into() })?;

    let starter = Arc::new(LazyStart::default());
    let rpc = Arc::new(RpcClient::new(
        Arc::new(http),
        credentials_from(cli.username, cli.password),
        Arc::clone(&starter) as Arc<dyn TransportEvents>,
    ));

    let store = Arc::new(MemoryStateStore::new());
    let kv = Arc::new(JsonFileKv::new(cli.state_file));
    let engine = Arc::new(
        SyncEngine::new(
            rpc,
            store,
            Arc::new(LogNotifier),
            kv,
            EngineOptions {
                notify_on_complete: !cli.no_notify,
            },
        )
        .await?,
    );

    let scheduler = Arc::new(TokioScheduler::new());
    let daemon = Arc::new(PollDaemon::new(
        Arc::clone(&engine) as Arc<dyn Refresher>,
        Arc::clone(&scheduler) as Arc<dyn RefreshScheduler>,
        cli.poll_interval_ms,
    ));
    scheduler.set_handler(Arc::new(DaemonTicks {
        daemon: Arc::clone(&daemon),
    }));
    starter.install(Arc::clone(&daemon));

    info!(url = %cli.url, "connecting to daemon");
    engine.update_settings().await?;
    engine.refresh_torrents(true).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| AppError::Scheduler { source: err.into() })?;
    info!("shutdown requested");
    daemon.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_a_login() {
        assert!(credentials_from(None, Some("secret".to_string())).is_none());
        let creds = credentials_from(Some("admin".to_string()), None).expect("login only");
        assert_eq!(creds.login, "admin");
        assert_eq!(creds.password, "");
    }

    #[tokio::test]
    async fn lazy_start_fires_once() {
        use tidemark_test_support::ManualScheduler;

        struct NeverRefreshes;

        #[async_trait]
        impl Refresher for NeverRefreshes {
            async fn refresh(&self, _force: bool) -> tidemark_sync::SyncResult<()> {
                Ok(())
            }
        }

        let scheduler = Arc::new(ManualScheduler::default());
        let daemon = Arc::new(PollDaemon::new(
            Arc::new(NeverRefreshes),
            Arc::clone(&scheduler) as Arc<dyn RefreshScheduler>,
            60_000,
        ));
        let starter = LazyStart::default();

        // Before installation a connected signal is a no-op.
        starter.connected().await;
        assert!(!daemon.is_active());

        let starter = LazyStart::default();
        starter.install(Arc::clone(&daemon));
        starter.connected().await;
        starter.connected().await;
        assert!(daemon.is_active());
        assert_eq!(scheduler.period_minutes(REFRESH_SCHEDULE), Some(1));
    }
}
