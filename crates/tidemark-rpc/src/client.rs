//! Retry client owning the session token and wire dialect.
//!
//! One [`RpcClient::call`] performs a logical RPC reliably: it signs the
//! request, renews the session token on a 409 challenge (one retry), backs
//! off through transient network failures (three retries), and classifies
//! everything else into an [`RpcError`] without retrying.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::casing::{SNAKE_CASE_RPC_VERSION, snake_case_keys};
use crate::error::{RpcError, RpcResult};
use crate::http::{Credentials, HttpRequest, RpcHttp};
use crate::repair;

/// Network-level retries after the initial attempt.
const NETWORK_RETRY_LIMIT: u32 = 3;
/// First backoff delay; doubles per retry (1s, 2s, 4s).
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Signals raised by the transport towards the daemon supervisor.
#[async_trait::async_trait]
pub trait TransportEvents: Send + Sync {
    /// An exchange completed successfully; used to lazily start polling.
    async fn connected(&self) {}

    /// The server issued a replacement session token.
    async fn token_refreshed(&self, token: &str) {
        let _ = token;
    }
}

/// Events sink that ignores everything.
pub struct NullEvents;

#[async_trait::async_trait]
impl TransportEvents for NullEvents {}

/// Response-body parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyParser {
    /// Strict JSON only.
    #[default]
    Strict,
    /// Strict JSON with the tracker-field repair fallback; used by callers
    /// requesting tracker statistics.
    Repairing,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    result: String,
    #[serde(default)]
    arguments: Map<String, Value>,
}

struct SessionState {
    token: Option<String>,
    protocol_version: i64,
}

/// Transport for one daemon endpoint.
pub struct RpcClient {
    http: Arc<dyn RpcHttp>,
    credentials: Option<Credentials>,
    events: Arc<dyn TransportEvents>,
    session: Mutex<SessionState>,
}

impl RpcClient {
    /// Build a client over the given HTTP seam.
    #[must_use]
    pub const fn new(
        http: Arc<dyn RpcHttp>,
        credentials: Option<Credentials>,
        events: Arc<dyn TransportEvents>,
    ) -> Self {
        Self {
            http,
            credentials,
            events,
            session: Mutex::new(SessionState {
                token: None,
                protocol_version: 0,
            }),
        }
    }

    /// Protocol version learned from the last settings fetch; `0` (the
    /// oldest dialect) until then.
    #[must_use]
    pub fn protocol_version(&self) -> i64 {
        self.lock_session().protocol_version
    }

    /// Record the daemon's protocol version so subsequent calls use the
    /// matching key-casing dialect.
    pub fn record_protocol_version(&self, version: i64) {
        self.lock_session().protocol_version = version;
    }

    /// Current session token, if one has been learned.
    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        self.lock_session().token.clone()
    }

    /// Perform one logical RPC with the strict body parser.
    ///
    /// # Errors
    ///
    /// See [`RpcError`] for the failure classes and their retry behaviour.
    pub async fn call(
        &self,
        method: &str,
        arguments: Map<String, Value>,
    ) -> RpcResult<Map<String, Value>> {
        self.call_with_parser(method, arguments, BodyParser::Strict)
            .await
    }

    /// Perform one logical RPC with an explicit body parser.
    ///
    /// # Errors
    ///
    /// See [`RpcError`] for the failure classes and their retry behaviour.
    pub async fn call_with_parser(
        &self,
        method: &str,
        arguments: Map<String, Value>,
        parser: BodyParser,
    ) -> RpcResult<Map<String, Value>> {
        let body = self.serialize_request(method, arguments);
        let authorization = self.credentials.as_ref().map(Credentials::header_value);

        let mut token_retried = false;
        let mut network_retries = 0;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let request = HttpRequest {
                body: body.clone(),
                session_token: self.session_token(),
                authorization: authorization.clone(),
            };
            debug!(method, network_retries, token_retried, "issuing rpc call");

            let reply = match self.http.post(request).await {
                Ok(reply) => reply,
                Err(RpcError::Network { source }) => {
                    if network_retries >= NETWORK_RETRY_LIMIT {
                        return Err(RpcError::Network { source });
                    }
                    network_retries += 1;
                    warn!(
                        method,
                        retry = network_retries,
                        delay_secs = backoff.as_secs(),
                        "network failure, backing off before retry"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
                Err(other) => return Err(other),
            };

            if reply.status == 409 {
                if token_retried {
                    return Err(RpcError::Http {
                        status: reply.status,
                        reason: reply.reason,
                    });
                }
                token_retried = true;
                if let Some(token) = reply.session_token {
                    debug!(method, "session token renewed by daemon");
                    self.lock_session().token = Some(token.clone());
                    self.events.token_refreshed(&token).await;
                }
                continue;
            }

            if !(200..300).contains(&reply.status) {
                return Err(RpcError::Http {
                    status: reply.status,
                    reason: reply.reason,
                });
            }

            let value = match parser {
                BodyParser::Strict => serde_json::from_str::<Value>(&reply.body)
                    .map_err(|source| RpcError::Parse { source })?,
                BodyParser::Repairing => repair::parse(&reply.body)?,
            };
            let envelope: Envelope =
                serde_json::from_value(value).map_err(|source| RpcError::Parse { source })?;

            self.events.connected().await;

            if envelope.result != "success" {
                return Err(RpcError::Remote {
                    message: envelope.result,
                });
            }
            return Ok(envelope.arguments);
        }
    }

    fn serialize_request(&self, method: &str, arguments: Map<String, Value>) -> String {
        let arguments = if self.protocol_version() >= SNAKE_CASE_RPC_VERSION {
            snake_case_keys(arguments)
        } else {
            arguments
        };
        let mut request = Map::new();
        request.insert("method".to_string(), Value::String(method.to_string()));
        if !arguments.is_empty() {
            request.insert("arguments".to_string(), Value::Object(arguments));
        }
        Value::Object(request).to_string()
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
