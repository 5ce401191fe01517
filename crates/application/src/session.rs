//! Authentication session
//!
//! Owns the token state for one connected database context: sign-in,
//! single-flight token refresh, persisted auto-login, logout. All
//! mutation funnels through this type; the gateway shares it by clone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use homevault_domain::{AuthError, HttpMethod, Identity, token_expiry};

use crate::events::SessionEvents;
use crate::ports::{Clock, CredentialStore, HttpTransport, TransportRequest, TransportResponse};

/// Identity provider endpoints. The defaults target the Google
/// identity toolkit; tests point them at a mock.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Email/password credential-exchange endpoint.
    pub identity_url: String,
    /// Refresh-token exchange endpoint.
    pub token_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity_url: "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword"
                .to_string(),
            token_url: "https://securetoken.googleapis.com/v1/token".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    api_key: String,
    id_token: String,
    refresh_token: String,
    token_expiry: Option<DateTime<Utc>>,
    user_email: String,
    user_id: String,
    authenticated: bool,
}

impl SessionState {
    fn clear_identity(&mut self) {
        self.id_token.clear();
        self.refresh_token.clear();
        self.token_expiry = None;
        self.user_email.clear();
        self.user_id.clear();
        self.authenticated = false;
    }
}

/// Successful credential-exchange payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    local_id: String,
    /// The provider sends this as a decimal string.
    #[serde(default)]
    expires_in: Option<String>,
}

/// Successful refresh-token exchange payload (snake_case endpoint).
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    message: String,
}

/// Releases the single-flight flag on every exit path.
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The authenticated-request session.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct AuthSession {
    state: Arc<RwLock<SessionState>>,
    refresh_in_flight: Arc<AtomicBool>,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn SessionEvents>,
    config: SessionConfig,
}

impl AuthSession {
    /// Creates an empty (unauthenticated) session.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SessionEvents>,
        config: SessionConfig,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            refresh_in_flight: Arc::new(AtomicBool::new(false)),
            transport,
            credentials,
            clock,
            events,
            config,
        }
    }

    /// Sets the provider API key. Refused (returns `false`) once the
    /// session is authenticated; the key is configuration, fixed for
    /// the life of the signed-in session.
    pub async fn set_api_key(&self, api_key: &str) -> bool {
        let mut state = self.state.write().await;
        if state.authenticated {
            return false;
        }
        state.api_key = api_key.to_string();
        true
    }

    /// Whether the session currently holds a usable token.
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    /// Email of the signed-in user, empty when unauthenticated.
    pub async fn current_user_email(&self) -> String {
        self.state.read().await.user_email.clone()
    }

    /// Instant after which the current token is considered stale.
    pub async fn token_expiry(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.token_expiry
    }

    pub(crate) async fn id_token(&self) -> String {
        self.state.read().await.id_token.clone()
    }

    /// Demotes the session after the gateway exhausted its retry.
    pub(crate) async fn mark_unauthenticated(&self) {
        self.state.write().await.authenticated = false;
    }

    /// Exchanges email/password for a token pair.
    ///
    /// When `remember` is set, the credentials and the refresh token
    /// are persisted for [`Self::try_auto_login`].
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingApiKey`] without a configured key, a mapped
    /// provider error on rejection, [`AuthError::Network`] when the
    /// exchange never completed.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<Identity, AuthError> {
        let result = self.sign_in_inner(email, password, remember).await;
        // Observers hear about every finished attempt, whether the
        // provider rejected it or the exchange never completed.
        self.events.authentication_completed(result.is_ok(), email);
        result
    }

    async fn sign_in_inner(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<Identity, AuthError> {
        let api_key = self.state.read().await.api_key.clone();
        if api_key.is_empty() {
            return Err(AuthError::MissingApiKey);
        }

        let url = format!("{}?key={}", self.config.identity_url, api_key);
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        })
        .to_string();

        let response = self
            .transport
            .execute(TransportRequest::json(HttpMethod::Post, url, payload))
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.is_success() {
            let err = provider_error(&response);
            debug!(%email, error = %err, "sign-in rejected");
            return Err(err);
        }

        let parsed: SignInResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let expiry = token_expiry(self.clock.now(), parse_expires_in(parsed.expires_in.as_deref()));
        let refresh_token = parsed.refresh_token;
        let resolved_email = if parsed.email.is_empty() {
            email.to_string()
        } else {
            parsed.email
        };

        let identity = Identity {
            email: resolved_email.clone(),
            user_id: parsed.local_id.clone(),
        };

        {
            let mut state = self.state.write().await;
            state.id_token = parsed.id_token;
            state.refresh_token = refresh_token.clone();
            state.token_expiry = Some(expiry);
            state.user_email = resolved_email;
            state.user_id = parsed.local_id;
            state.authenticated = true;
        }

        if remember {
            if let Err(e) = self.credentials.save(email, password).await {
                warn!(error = %e, "failed to persist credentials");
            }
            if !refresh_token.is_empty()
                && let Err(e) = self.credentials.save_refresh_token(&refresh_token).await
            {
                warn!(error = %e, "failed to persist refresh token");
            }
        }

        debug!(%email, "sign-in completed");
        Ok(identity)
    }

    /// Exchanges the refresh token for a fresh access token.
    ///
    /// Single-flight: a second caller while one exchange is in flight
    /// gets [`AuthError::RefreshInProgress`] immediately, with no
    /// network call and no state change.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoRefreshToken`] / [`AuthError::MissingApiKey`]
    /// when preconditions fail; provider or network errors otherwise.
    /// A failed refresh leaves `authenticated` untouched; demotion is
    /// the gateway's decision.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let Some(_guard) = RefreshGuard::acquire(&self.refresh_in_flight) else {
            return Err(AuthError::RefreshInProgress);
        };

        let (api_key, refresh_token) = {
            let state = self.state.read().await;
            (state.api_key.clone(), state.refresh_token.clone())
        };
        if refresh_token.is_empty() {
            return Err(AuthError::NoRefreshToken);
        }
        if api_key.is_empty() {
            return Err(AuthError::MissingApiKey);
        }

        let url = format!("{}?key={}", self.config.token_url, api_key);
        let body = serde_urlencoded::to_string([
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .map_err(|e| AuthError::Network(e.to_string()))?;

        let response = self
            .transport
            .execute(TransportRequest::form(HttpMethod::Post, url, body))
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.is_success() {
            let err = provider_error(&response);
            debug!(error = %err, "token refresh rejected");
            return Err(err);
        }

        let parsed: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let expiry = token_expiry(self.clock.now(), parse_expires_in(parsed.expires_in.as_deref()));
        let new_refresh = parsed.refresh_token.unwrap_or(refresh_token);

        {
            let mut state = self.state.write().await;
            state.id_token = parsed.id_token;
            state.refresh_token = new_refresh.clone();
            state.token_expiry = Some(expiry);
            if let Some(user_id) = parsed.user_id {
                state.user_id = user_id;
            }
            state.authenticated = true;
        }

        if let Err(e) = self.credentials.save_refresh_token(&new_refresh).await {
            warn!(error = %e, "failed to persist refresh token");
        }

        debug!("token refreshed");
        Ok(())
    }

    /// Signs in from persisted state, preferring the saved refresh
    /// token so the password never goes over the wire when a valid
    /// token exists. Falls back to the saved email/password pair.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoSavedCredentials`] when nothing is persisted;
    /// otherwise whatever the underlying refresh or sign-in returned.
    pub async fn try_auto_login(&self) -> Result<Identity, AuthError> {
        let saved_refresh = self
            .credentials
            .load_refresh_token()
            .await
            .ok()
            .flatten()
            .filter(|token| !token.is_empty());
        let has_saved = self.credentials.has_saved().await;

        if saved_refresh.is_none() && !has_saved {
            return Err(AuthError::NoSavedCredentials);
        }

        if let Some(token) = saved_refresh {
            self.state.write().await.refresh_token = token;
            match self.refresh().await {
                Ok(()) => {
                    let email = self
                        .credentials
                        .load()
                        .await
                        .ok()
                        .flatten()
                        .map(|c| c.email)
                        .unwrap_or_default();
                    let user_id = {
                        let mut state = self.state.write().await;
                        if !email.is_empty() {
                            state.user_email = email.clone();
                        }
                        state.user_id.clone()
                    };
                    debug!(%email, "auto-login via refresh token");
                    self.events.authentication_completed(true, &email);
                    return Ok(Identity { email, user_id });
                }
                Err(err) => {
                    if !has_saved {
                        return Err(err);
                    }
                    debug!(error = %err, "saved refresh token rejected, falling back to password");
                }
            }
        }

        let Some(creds) = self.credentials.load().await.ok().flatten() else {
            return Err(AuthError::NoSavedCredentials);
        };
        self.sign_in(&creds.email, &creds.password, false).await
    }

    /// Clears all in-memory identity state. With `clear_saved`, also
    /// purges the credential store. The API key survives.
    pub async fn logout(&self, clear_saved: bool) {
        self.state.write().await.clear_identity();
        if clear_saved && let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "failed to clear saved credentials");
        }
    }
}

fn parse_expires_in(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.parse::<i64>().ok())
}

fn provider_error(response: &TransportResponse) -> AuthError {
    match serde_json::from_slice::<ProviderErrorEnvelope>(&response.body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            AuthError::from_provider_code(&envelope.error.message)
        }
        _ => AuthError::Provider(format!("HTTP {}", response.status)),
    }
}
