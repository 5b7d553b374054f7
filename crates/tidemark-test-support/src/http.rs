//! Scripted implementation of the transport's HTTP seam.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tidemark_rpc::{HttpReply, HttpRequest, RpcError, RpcHttp, RpcResult};

/// One scripted outcome consumed per attempt, oldest first.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// The exchange reaches the server and yields this reply.
    Reply(HttpReply),
    /// The connection fails at the network level.
    NetworkDown,
}

impl ScriptedReply {
    /// A 200 reply whose envelope reports `success` with these arguments.
    #[must_use]
    pub fn success(arguments: Value) -> Self {
        Self::Reply(HttpReply {
            status: 200,
            reason: "OK".to_string(),
            session_token: None,
            body: json!({"result": "success", "arguments": arguments}).to_string(),
        })
    }

    /// A 200 reply whose envelope reports a non-success result string.
    #[must_use]
    pub fn remote_failure(message: &str) -> Self {
        Self::Reply(HttpReply {
            status: 200,
            reason: "OK".to_string(),
            session_token: None,
            body: json!({"result": message}).to_string(),
        })
    }

    /// A stale-token conflict offering a replacement token.
    #[must_use]
    pub fn conflict(token: &str) -> Self {
        Self::Reply(HttpReply {
            status: 409,
            reason: "Conflict".to_string(),
            session_token: Some(token.to_string()),
            body: String::new(),
        })
    }

    /// An arbitrary HTTP failure status.
    #[must_use]
    pub fn http_error(status: u16, reason: &str) -> Self {
        Self::Reply(HttpReply {
            status,
            reason: reason.to_string(),
            session_token: None,
            body: String::new(),
        })
    }

    /// A 200 reply with a verbatim body, for parser-level scenarios.
    #[must_use]
    pub fn raw_body(body: &str) -> Self {
        Self::Reply(HttpReply {
            status: 200,
            reason: "OK".to_string(),
            session_token: None,
            body: body.to_string(),
        })
    }
}

/// One attempt observed by the scripted seam.
#[derive(Debug, Clone)]
pub struct RecordedAttempt {
    /// Token header the client attached.
    pub session_token: Option<String>,
    /// Serialized request body.
    pub body: String,
    /// Time since the script was created, on the tokio clock.
    pub elapsed: Duration,
}

/// Scripted [`RpcHttp`] recording every attempt. An exhausted script answers
/// with network failures so runaway retries terminate.
pub struct ScriptedHttp {
    started: tokio::time::Instant,
    script: Mutex<VecDeque<ScriptedReply>>,
    attempts: Mutex<Vec<RecordedAttempt>>,
}

impl ScriptedHttp {
    /// Build a seam that plays back the given outcomes in order.
    ///
    /// Must be called inside a tokio runtime so the scripted clock exists.
    #[must_use]
    pub fn new(script: Vec<ScriptedReply>) -> Self {
        Self {
            started: tokio::time::Instant::now(),
            script: Mutex::new(script.into()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Append another outcome to the script.
    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.script).push_back(reply);
    }

    /// Every attempt observed so far.
    #[must_use]
    pub fn attempts(&self) -> Vec<RecordedAttempt> {
        lock(&self.attempts).clone()
    }

    /// Bodies of every attempt observed so far.
    #[must_use]
    pub fn bodies(&self) -> Vec<String> {
        self.attempts()
            .into_iter()
            .map(|attempt| attempt.body)
            .collect()
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
