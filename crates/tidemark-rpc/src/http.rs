//! HTTP exchange seam between the retry client and the network.
//!
//! The client drives a [`RpcHttp`] implementation so the token/retry logic
//! can be exercised against scripted fakes; [`ReqwestHttp`] is the
//! production implementation.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};

use crate::error::{RpcError, RpcResult};

/// Header carrying the session token in both directions.
pub const SESSION_TOKEN_HEADER: &str = "X-Transmission-Session-Id";

/// Login and password for daemons with authentication enabled.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account login.
    pub login: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Signed credential header value (`Basic` scheme).
    #[must_use]
    pub fn header_value(&self) -> String {
        let pair = format!("{}:{}", self.login, self.password);
        format!("Basic {}", general_purpose::STANDARD.encode(pair))
    }
}

/// One outgoing RPC exchange.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Serialized JSON request body.
    pub body: String,
    /// Current session token, when one has been learned.
    pub session_token: Option<String>,
    /// Credential header value, when authentication is configured.
    pub authorization: Option<String>,
}

/// Result of one HTTP round trip that reached the server.
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Status reason text, empty when the stack does not expose one.
    pub reason: String,
    /// Replacement session token offered by the server, if any.
    pub session_token: Option<String>,
    /// Raw response body.
    pub body: String,
}

/// Single-endpoint HTTP POST seam.
///
/// Implementations return `Ok` for any exchange that produced an HTTP
/// status, including non-2xx ones; only failures to complete the round trip
/// map to [`RpcError::Network`].
#[async_trait]
pub trait RpcHttp: Send + Sync {
    /// Perform one POST of the request body to the fixed endpoint.
    async fn post(&self, request: HttpRequest) -> RpcResult<HttpReply>;
}

/// Production exchange backed by `reqwest`.
pub struct ReqwestHttp {
    client: Client,
    endpoint: Url,
}

impl ReqwestHttp {
    /// Build a client for the fixed endpoint URL with the given request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Network`] when the underlying client cannot be
    /// constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::network)?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RpcHttp for ReqwestHttp {
    async fn post(&self, request: HttpRequest) -> RpcResult<HttpReply> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &request.session_token
            && let Ok(value) = HeaderValue::from_str(token)
        {
            headers.insert(SESSION_TOKEN_HEADER, value);
        }
        if let Some(authorization) = &request.authorization
            && let Ok(value) = HeaderValue::from_str(authorization)
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(headers)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(request.body)
            .send()
            .await
            .map_err(RpcError::network)?;

        let status = response.status();
        let session_token = response
            .headers()
            .get(SESSION_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.map_err(RpcError::network)?;

        Ok(HttpReply {
            status: status.as_u16(),
            reason,
            session_token,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_header_uses_basic_scheme() {
        let credentials = Credentials {
            login: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        assert_eq!(credentials.header_value(), "Basic YWRtaW46aHVudGVyMg==");
    }
}
