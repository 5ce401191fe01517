//! Authentication types: identity, token expiry math, error taxonomy.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Seconds subtracted from a token's nominal lifetime so the client
/// treats it as stale slightly before the server does.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

/// Lifetime assumed when the provider omits `expiresIn` or sends zero.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// The authenticated user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Email address the session was established with.
    pub email: String,
    /// Provider-assigned user id (`localId`).
    pub user_id: String,
}

/// Computes the absolute instant after which a token is considered
/// stale: issue time plus the provider lifetime minus the safety
/// margin.
#[must_use]
pub fn token_expiry(issued_at: DateTime<Utc>, expires_in_secs: Option<i64>) -> DateTime<Utc> {
    let lifetime = match expires_in_secs {
        Some(secs) if secs > 0 => secs,
        _ => DEFAULT_TOKEN_LIFETIME_SECS,
    };
    issued_at + Duration::seconds(lifetime - TOKEN_EXPIRY_MARGIN_SECS)
}

/// Errors raised by the authentication session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The API key has not been configured.
    #[error("API key is not configured")]
    MissingApiKey,

    /// The provider rejected the password.
    #[error("invalid password")]
    InvalidPassword,

    /// No account exists for the given email.
    #[error("no account exists for this email")]
    EmailNotFound,

    /// The account has been disabled by an administrator.
    #[error("this account has been disabled")]
    UserDisabled,

    /// The provider is throttling sign-in attempts.
    #[error("too many attempts, try again later")]
    RateLimited,

    /// Any other provider-reported failure.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// A refresh was requested without a refresh token on hand.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// Another refresh is already in flight; no new call was made.
    #[error("a token refresh is already in progress")]
    RefreshInProgress,

    /// Auto-login was requested but nothing is saved.
    #[error("no saved credentials")]
    NoSavedCredentials,

    /// The request never reached the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a body we could not parse.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Maps a provider error code (the `error.message` field of a
    /// failed identity call) onto the taxonomy.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => Self::InvalidPassword,
            "EMAIL_NOT_FOUND" => Self::EmailNotFound,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::RateLimited,
            other => Self::Provider(other.to_string()),
        }
    }
}
