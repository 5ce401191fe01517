//! Shared mocks for application-layer tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;

use homevault_domain::HttpMethod;

use crate::events::SessionEvents;
use crate::ports::{
    Clock, CredentialError, CredentialStore, HttpTransport, SavedCredentials, TransportError,
    TransportRequest, TransportResponse,
};
use crate::session::{AuthSession, SessionConfig};

/// One request as seen by the mock transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
}

/// Scripted transport: answers from a queue and records every call.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that parks every call on the semaphore until the
    /// test hands it a permit. Used for in-flight overlap tests.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_ok(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn push_err(&self, err: TransportError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method,
            url: request.url,
            body: request.body,
        });
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::Other("gate closed".to_string()))?;
            permit.forget();
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TransportResponse {
                    status: 200,
                    body: b"null".to_vec(),
                })
            })
    }
}

/// In-memory credential store with call counters.
#[derive(Default)]
pub struct MockCredentials {
    saved: Mutex<Option<SavedCredentials>>,
    refresh_token: Mutex<Option<String>>,
    clear_calls: Mutex<usize>,
    save_refresh_calls: Mutex<usize>,
}

impl MockCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(self, email: &str, password: &str) -> Self {
        *self.saved.lock().unwrap() = Some(SavedCredentials {
            email: email.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn with_refresh_token(self, token: &str) -> Self {
        *self.refresh_token.lock().unwrap() = Some(token.to_string());
        self
    }

    pub fn saved(&self) -> Option<SavedCredentials> {
        self.saved.lock().unwrap().clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().unwrap().clone()
    }

    pub fn clear_count(&self) -> usize {
        *self.clear_calls.lock().unwrap()
    }

    pub fn save_refresh_count(&self) -> usize {
        *self.save_refresh_calls.lock().unwrap()
    }
}

#[async_trait]
impl CredentialStore for MockCredentials {
    async fn has_saved(&self) -> bool {
        self.saved.lock().unwrap().is_some()
    }

    async fn save(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        *self.saved.lock().unwrap() = Some(SavedCredentials {
            email: email.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedCredentials>, CredentialError> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        *self.clear_calls.lock().unwrap() += 1;
        *self.saved.lock().unwrap() = None;
        *self.refresh_token.lock().unwrap() = None;
        Ok(())
    }

    async fn save_refresh_token(&self, token: &str) -> Result<(), CredentialError> {
        *self.save_refresh_calls.lock().unwrap() += 1;
        *self.refresh_token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    async fn load_refresh_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.refresh_token.lock().unwrap().clone())
    }
}

/// Clock pinned to a fixed instant.
pub struct MockClock {
    now: DateTime<Utc>,
}

impl MockClock {
    pub fn fixed() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().unwrap(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// One observed session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Completed { success: bool, email: String },
    Required,
}

/// Observer that records every event for later assertions.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn required_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, RecordedEvent::Required))
            .count()
    }

    pub fn reset(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl SessionEvents for RecordingEvents {
    fn authentication_completed(&self, success: bool, email: &str) {
        self.events.lock().unwrap().push(RecordedEvent::Completed {
            success,
            email: email.to_string(),
        });
    }

    fn authentication_required(&self) {
        self.events.lock().unwrap().push(RecordedEvent::Required);
    }
}

/// Endpoint config pointing at obviously-fake hosts so tests can tell
/// identity traffic from data traffic by URL.
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        identity_url: "https://id.test/signin".to_string(),
        token_url: "https://id.test/token".to_string(),
    }
}

pub fn sign_in_ok_body(expires_in: &str) -> String {
    format!(
        r#"{{"idToken":"tok-1","refreshToken":"refresh-1","email":"user@example.com","localId":"uid-1","expiresIn":"{expires_in}"}}"#
    )
}

pub fn refresh_ok_body(token: &str) -> String {
    format!(
        r#"{{"id_token":"{token}","refresh_token":"refresh-2","expires_in":"3600","user_id":"uid-1"}}"#
    )
}

pub fn provider_error_body(code: &str) -> String {
    format!(r#"{{"error":{{"message":"{code}"}}}}"#)
}

/// Everything a session/gateway test needs, wired together.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub credentials: Arc<MockCredentials>,
    pub clock: Arc<MockClock>,
    pub events: Arc<RecordingEvents>,
    pub session: AuthSession,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(MockTransport::new()), Arc::new(MockCredentials::new()))
    }

    pub fn with_parts(transport: Arc<MockTransport>, credentials: Arc<MockCredentials>) -> Self {
        let clock = Arc::new(MockClock::fixed());
        let events = Arc::new(RecordingEvents::default());
        let session = AuthSession::new(
            transport.clone(),
            credentials.clone(),
            clock.clone(),
            events.clone(),
            test_session_config(),
        );
        Self {
            transport,
            credentials,
            clock,
            events,
            session,
        }
    }

    /// Signs the session in against a scripted provider response, then
    /// wipes the recorded calls and events so assertions start clean.
    pub async fn signed_in(self) -> Self {
        assert!(self.session.set_api_key("key-1").await);
        self.transport.push_ok(200, &sign_in_ok_body("3600"));
        self.session
            .sign_in("user@example.com", "hunter2", false)
            .await
            .unwrap();
        self.transport.reset_calls();
        self.events.reset();
        self
    }
}
