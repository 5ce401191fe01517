//! HTTP transport port
//!
//! A thin request/response abstraction over whichever HTTP library the
//! infrastructure layer provides. The application core never touches
//! the library directly.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use homevault_domain::HttpMethod;

/// Fixed per-request timeout used by the session and the gateway.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully-built outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL, query string included.
    pub url: String,
    /// Request body, if any.
    pub body: Option<String>,
    /// Content-Type header for the body.
    pub content_type: Option<&'static str>,
    /// Hard deadline for the whole exchange.
    pub timeout: Duration,
}

impl TransportRequest {
    /// A body-less request (GET/DELETE).
    #[must_use]
    pub const fn new(method: HttpMethod, url: String) -> Self {
        Self {
            method,
            url,
            body: None,
            content_type: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A request carrying a JSON body.
    #[must_use]
    pub const fn json(method: HttpMethod, url: String, body: String) -> Self {
        Self {
            method,
            url,
            body: Some(body),
            content_type: Some("application/json"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A request carrying a form-urlencoded body.
    #[must_use]
    pub const fn form(method: HttpMethod, url: String, body: String) -> Self {
        Self {
            method,
            url,
            body: Some(body),
            content_type: Some("application/x-www-form-urlencoded"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The raw answer from the wire: status plus body bytes.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// The store rejected our token.
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        self.status == 401
    }

    /// Body as UTF-8, lossy. Used for error excerpts only.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Errors at the transport level, before any protocol interpretation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The timeout elapsed before a response arrived.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Anything else the HTTP library reports.
    #[error("transport error: {0}")]
    Other(String),
}

/// Port for executing HTTP requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes the request, blocking the caller until a response
    /// arrives or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no HTTP response was obtained
    /// at all. Non-2xx responses are NOT errors at this level.
    async fn execute(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportError>;
}
