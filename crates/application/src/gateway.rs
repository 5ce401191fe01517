//! Request gateway
//!
//! Wraps the transport for data-endpoint traffic: attaches the current
//! access token as the `auth` query parameter, detects authentication
//! rejections, and runs exactly one refresh-and-retry cycle before
//! giving up and demoting the session.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use url::Url;

use homevault_domain::{HttpMethod, RequestError, RequestResult};

use crate::events::SessionEvents;
use crate::ports::{HttpTransport, TransportError, TransportRequest, TransportResponse};
use crate::session::AuthSession;

/// Retries allowed after an authentication rejection. Exactly one,
/// and only when the intervening refresh succeeded.
const MAX_AUTH_RETRIES: usize = 1;

/// How much response body to quote in transport error messages.
const ERROR_EXCERPT_LEN: usize = 200;

/// Authenticated-request pipeline over the document store.
pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    session: AuthSession,
    events: Arc<dyn SessionEvents>,
    base_url: RwLock<Option<Url>>,
    last_error: Mutex<Option<String>>,
}

impl RequestGateway {
    /// Creates a gateway sharing the given session.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: AuthSession,
        events: Arc<dyn SessionEvents>,
    ) -> Self {
        Self {
            transport,
            session,
            events,
            base_url: RwLock::new(None),
            last_error: Mutex::new(None),
        }
    }

    /// Accepts and normalizes the store's base URL. This is a pure
    /// configuration step; reachability is checked by the first call.
    ///
    /// # Errors
    /// Returns [`RequestError::Transport`] when the URL does not parse.
    pub async fn set_base_url(&self, base: &str) -> RequestResult<()> {
        let trimmed = base.trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| RequestError::Transport(format!("invalid base URL {base:?}: {e}")))?;
        *self.base_url.write().await = Some(parsed);
        Ok(())
    }

    /// Drops the configured base URL.
    pub async fn clear_base_url(&self) {
        *self.base_url.write().await = None;
    }

    /// Whether a base URL has been accepted.
    pub async fn is_connected(&self) -> bool {
        self.base_url.read().await.is_some()
    }

    /// The most recent failure description, for callers that already
    /// discarded the result. Cleared by any successful call.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Executes one authenticated call against the store.
    ///
    /// Bodies are compact JSON. The parsed response body is returned
    /// (`null` for empty bodies, as the store answers on deletes).
    ///
    /// # Errors
    ///
    /// See [`RequestError`]; only authentication rejections are ever
    /// retried, and only once after a successful refresh.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> RequestResult<Value> {
        let result = self.execute_inner(method, path, body).await;
        *self.last_error.lock().await = result.as_ref().err().map(ToString::to_string);
        result
    }

    async fn execute_inner(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> RequestResult<Value> {
        if !self.session.is_authenticated().await {
            self.events.authentication_required();
            return Err(RequestError::NotAuthenticated);
        }
        let base = self
            .base_url
            .read()
            .await
            .clone()
            .ok_or(RequestError::NotConnected)?;

        let payload = body.map(Value::to_string);

        for attempt in 0..=MAX_AUTH_RETRIES {
            // Re-read the token each attempt; a refresh replaces it.
            let token = self.session.id_token().await;
            let url = Self::build_url(&base, path, &token)?;
            let request = match &payload {
                Some(json) => TransportRequest::json(method, url, json.clone()),
                None => TransportRequest::new(method, url),
            };

            let response = match self.transport.execute(request).await {
                Ok(response) => response,
                Err(TransportError::Timeout { .. }) => return Err(RequestError::Timeout),
                Err(e) => return Err(RequestError::Transport(e.to_string())),
            };

            if response.is_auth_rejected() {
                if attempt < MAX_AUTH_RETRIES && self.session.refresh().await.is_ok() {
                    debug!(%method, path, "token refreshed, retrying once");
                    continue;
                }
                self.session.mark_unauthenticated().await;
                self.events.authentication_required();
                return Err(RequestError::AuthenticationExpired);
            }

            return Self::parse_response(&response);
        }

        // The rejection branch above always returns on the last attempt.
        Err(RequestError::AuthenticationExpired)
    }

    fn build_url(base: &Url, path: &str, token: &str) -> RequestResult<String> {
        let mut url = base
            .join(path)
            .map_err(|e| RequestError::Transport(format!("invalid path {path:?}: {e}")))?;
        if !token.is_empty() {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url.into())
    }

    fn parse_response(response: &TransportResponse) -> RequestResult<Value> {
        if !response.is_success() {
            // Truncate on characters, not bytes; bodies are not ASCII.
            let excerpt: String = response
                .body_text()
                .chars()
                .take(ERROR_EXCERPT_LEN)
                .collect();
            return Err(RequestError::Transport(format!(
                "HTTP {}: {excerpt}",
                response.status
            )));
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body)
            .map_err(|e| RequestError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{
        RecordedEvent, TestHarness, provider_error_body, refresh_ok_body,
    };
    use serde_json::json;

    const BASE: &str = "https://db.test";

    async fn connected_gateway(harness: &TestHarness) -> RequestGateway {
        let gateway = RequestGateway::new(
            harness.transport.clone(),
            harness.session.clone(),
            harness.events.clone(),
        );
        gateway.set_base_url(BASE).await.unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_fail_fast_when_unauthenticated() {
        let harness = TestHarness::new();
        let gateway = connected_gateway(&harness).await;

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        assert_eq!(result, Err(RequestError::NotAuthenticated));
        assert_eq!(harness.transport.call_count(), 0);
        assert_eq!(harness.events.events(), vec![RecordedEvent::Required]);
    }

    #[tokio::test]
    async fn test_not_connected_without_base_url() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = RequestGateway::new(
            harness.transport.clone(),
            harness.session.clone(),
            harness.events.clone(),
        );

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;
        assert_eq!(result, Err(RequestError::NotConnected));
        assert_eq!(harness.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_attached_as_auth_query_param() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(200, r#"{"ok":true}"#);

        let value = gateway
            .execute(HttpMethod::Get, "/objects.json", None)
            .await
            .unwrap();

        assert_eq!(value, json!({"ok": true}));
        let calls = harness.transport.calls();
        assert_eq!(calls[0].url, "https://db.test/objects.json?auth=tok-1");
    }

    #[tokio::test]
    async fn test_retry_once_with_refreshed_token() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(401, "");
        harness.transport.push_ok(200, &refresh_ok_body("tok-2"));
        harness.transport.push_ok(200, r#"{"a":1}"#);

        let value = gateway
            .execute(HttpMethod::Get, "/objects.json", None)
            .await
            .unwrap();

        assert_eq!(value, json!({"a": 1}));
        let calls = harness.transport.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].url.starts_with("https://id.test/token"));
        // Retry carries the refreshed token.
        assert_eq!(calls[2].url, "https://db.test/objects.json?auth=tok-2");
        assert!(harness.session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_second_rejection_expires_after_one_refresh() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(401, "");
        harness.transport.push_ok(200, &refresh_ok_body("tok-2"));
        harness.transport.push_ok(401, "");

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        assert_eq!(result, Err(RequestError::AuthenticationExpired));
        // One original attempt, one refresh, one retry. Nothing more.
        assert_eq!(harness.transport.call_count(), 3);
        assert!(!harness.session.is_authenticated().await);
        assert_eq!(harness.events.required_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_demotes_session() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(401, "");
        harness
            .transport
            .push_ok(400, &provider_error_body("TOKEN_EXPIRED"));

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        assert_eq!(result, Err(RequestError::AuthenticationExpired));
        assert_eq!(harness.transport.call_count(), 2);
        assert!(!harness.session.is_authenticated().await);
        assert_eq!(harness.events.required_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_never_retried() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness
            .transport
            .push_err(TransportError::Timeout { timeout_ms: 10_000 });

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        assert_eq!(result, Err(RequestError::Timeout));
        assert_eq!(harness.transport.call_count(), 1);
        assert!(harness.session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness
            .transport
            .push_err(TransportError::Connection("refused".to_string()));

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        assert!(matches!(result, Err(RequestError::Transport(_))));
        assert_eq!(harness.transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_excerpt_handles_multibyte_bodies() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        // A multibyte character straddling the excerpt cutoff must not
        // break the truncation.
        let body = format!("{}été du serveur", "x".repeat(ERROR_EXCERPT_LEN - 1));
        harness.transport.push_ok(500, &body);

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;

        let err = result.unwrap_err();
        assert!(matches!(err, RequestError::Transport(_)));
        let excerpt = err
            .to_string()
            .trim_start_matches("transport error: HTTP 500: ")
            .to_string();
        assert!(excerpt.starts_with("xxx"));
        assert!(excerpt.ends_with("é"));
        assert_eq!(excerpt.chars().count(), ERROR_EXCERPT_LEN);
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(200, "definitely not json");

        let result = gateway.execute(HttpMethod::Get, "/objects.json", None).await;
        assert!(matches!(result, Err(RequestError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_empty_body_parses_as_null() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(200, "");

        let value = gateway
            .execute(HttpMethod::Delete, "/objects/Lamp.json", None)
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_body_sent_compact() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;
        harness.transport.push_ok(200, "null");

        gateway
            .execute(
                HttpMethod::Put,
                "/colors.json",
                Some(&json!(["Red", "Blue"])),
            )
            .await
            .unwrap();

        let calls = harness.transport.calls();
        assert_eq!(calls[0].body.as_deref(), Some(r#"["Red","Blue"]"#));
    }

    #[tokio::test]
    async fn test_last_error_tracks_most_recent_call() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = connected_gateway(&harness).await;

        harness
            .transport
            .push_err(TransportError::Timeout { timeout_ms: 10_000 });
        let _ = gateway.execute(HttpMethod::Get, "/objects.json", None).await;
        assert_eq!(gateway.last_error().await.as_deref(), Some("request timeout"));

        harness.transport.push_ok(200, "null");
        gateway
            .execute(HttpMethod::Get, "/objects.json", None)
            .await
            .unwrap();
        assert_eq!(gateway.last_error().await, None);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let harness = TestHarness::new().signed_in().await;
        let gateway = RequestGateway::new(
            harness.transport.clone(),
            harness.session.clone(),
            harness.events.clone(),
        );
        gateway.set_base_url("https://db.test/").await.unwrap();
        harness.transport.push_ok(200, "null");

        gateway
            .execute(HttpMethod::Get, "/objects.json", None)
            .await
            .unwrap();

        let calls = harness.transport.calls();
        assert_eq!(calls[0].url, "https://db.test/objects.json?auth=tok-1");
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_rejected() {
        let harness = TestHarness::new();
        let gateway = RequestGateway::new(
            harness.transport.clone(),
            harness.session.clone(),
            harness.events.clone(),
        );
        assert!(gateway.set_base_url("not a url").await.is_err());
        assert!(!gateway.is_connected().await);
    }
}
