//! Request-layer error taxonomy.

use thiserror::Error;

use crate::auth::AuthError;

/// Errors returned by the request gateway and the data-access layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// No base URL has been configured yet.
    #[error("not connected to database")]
    NotConnected,

    /// The session holds no valid token; no network call was made.
    #[error("authentication required")]
    NotAuthenticated,

    /// The store rejected the token and a refresh did not recover it.
    #[error("authentication expired")]
    AuthenticationExpired,

    /// The request exceeded the fixed timeout. Never retried.
    #[error("request timeout")]
    Timeout,

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not the JSON we expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An item failed validation before any network call.
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// An attribute value is already present in its list.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// An authentication operation failed underneath a request.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Result type alias for gateway and store operations.
pub type RequestResult<T> = Result<T, RequestError>;
