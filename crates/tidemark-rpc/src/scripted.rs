//! In-crate scripted HTTP seam for the client's unit tests.
//!
//! Downstream crates use the richer seam from the shared test-support
//! crate; this crate keeps its own copy so its unit tests do not link a
//! second build of itself through that crate.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::{RpcError, RpcResult};
use crate::http::{HttpReply, HttpRequest, RpcHttp};

/// One scripted outcome consumed per attempt, oldest first.
#[derive(Debug, Clone)]
pub(crate) enum ScriptedReply {
    /// The exchange reaches the server and yields this reply.
    Reply(HttpReply),
    /// The connection fails at the network level.
    NetworkDown,
}

impl ScriptedReply {
    /// A 200 reply whose envelope reports `success` with these arguments.
    pub(crate) fn success(arguments: Value) -> Self {
        Self::Reply(HttpReply {
            status: 200,
            reason: "OK".to_string(),
            session_token: None,
            body: json!({"result": "success", "arguments": arguments}).to_string(),
        })
    }

    /// A 200 reply whose envelope reports a non-success result string.
    pub(crate) fn remote_failure(message: &str) -> Self {
        Self::Reply(HttpReply {
            status: 200,
            reason: "OK".to_string(),
            session_token: None,
            body: json!({"result": message}).to_string(),
        })
    }

    /// A stale-token conflict offering a replacement token.
    pub(crate) fn conflict(token: &str) -> Self {
        Self::Reply(HttpReply {
            status: 409,
            reason: "Conflict".to_string(),
            session_token: Some(token.to_string()),
            body: String::new(),
        })
    }
}

/// One attempt observed by the scripted seam.
#[derive(Debug, Clone)]
pub(crate) struct RecordedAttempt {
    /// Token header the client attached.
    pub(crate) session_token: Option<String>,
    /// Serialized request body.
    pub(crate) body: String,
    /// Time since the script was created, on the tokio clock.
    pub(crate) elapsed: Duration,
}

/// Scripted [`RpcHttp`] recording every attempt. An exhausted script
/// answers with network failures so runaway retries terminate.
pub(crate) struct ScriptedHttp {
    started: tokio::time::Instant,
    script: Mutex<VecDeque<ScriptedReply>>,
    attempts: Mutex<Vec<RecordedAttempt>>,
}

impl ScriptedHttp {
    /// Build a seam that plays back the given outcomes in order.
    ///
    /// Must be called inside a tokio runtime so the scripted clock exists.
    pub(crate) fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            started: tokio::time::Instant::now(),
            script: Mutex::new(script.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every attempt observed so far.
    pub(crate) fn attempts(&self) -> Vec<RecordedAttempt> {
        lock(&self.attempts).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RpcHttp for ScriptedHttp {
    async fn post(&self, request: HttpRequest) -> RpcResult<HttpReply> {
        lock(&self.attempts).push(RecordedAttempt {
            session_token: request.session_token,
            body: request.body,
            elapsed: self.started.elapsed(),
        });
        let next = lock(&self.script)
            .pop_front()
            .unwrap_or(ScriptedReply::NetworkDown);
        match next {
            ScriptedReply::Reply(reply) => Ok(reply),
            ScriptedReply::NetworkDown => Err(RpcError::network(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted network failure",
            ))),
        }
    }
}

/// Shorthand turning a JSON object literal into an argument map.
pub(crate) fn arguments(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
