//! Database client facade
//!
//! One object per connected database context, wiring the session, the
//! gateway, and the store together and mirroring the flat interface
//! callers expect: connection management, authentication, and
//! inventory operations.

use std::sync::Arc;

use homevault_domain::{
    AttributeKind, AuthError, Identity, InventoryItem, ItemFilter, RequestResult,
};

use crate::events::SessionEvents;
use crate::gateway::RequestGateway;
use crate::ports::{Clock, CredentialStore, HttpTransport};
use crate::session::{AuthSession, SessionConfig};
use crate::store::InventoryStore;

/// Facade over one remote document store.
pub struct DatabaseClient {
    session: AuthSession,
    gateway: Arc<RequestGateway>,
    store: InventoryStore,
}

impl DatabaseClient {
    /// Creates a client with the default identity endpoints.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SessionEvents>,
    ) -> Self {
        Self::with_config(transport, credentials, clock, events, SessionConfig::default())
    }

    /// Creates a client against custom identity endpoints.
    #[must_use]
    pub fn with_config(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn SessionEvents>,
        config: SessionConfig,
    ) -> Self {
        let session = AuthSession::new(
            Arc::clone(&transport),
            credentials,
            clock,
            Arc::clone(&events),
            config,
        );
        let gateway = Arc::new(RequestGateway::new(transport, session.clone(), events));
        let store = InventoryStore::new(Arc::clone(&gateway));
        Self {
            session,
            gateway,
            store,
        }
    }

    // ----- connection -----

    /// Accepts the store's base URL. "Connected" means the
    /// configuration was accepted; reachability is validated by the
    /// first request.
    ///
    /// # Errors
    /// Returns an error when the URL does not parse.
    pub async fn connect(&self, base_url: &str) -> RequestResult<()> {
        self.gateway.set_base_url(base_url).await
    }

    /// Drops the base URL; subsequent data calls fail as not connected.
    pub async fn disconnect(&self) {
        self.gateway.clear_base_url().await;
    }

    /// Whether a base URL has been accepted.
    pub async fn is_connected(&self) -> bool {
        self.gateway.is_connected().await
    }

    /// The most recent data-call failure, if the last call failed.
    pub async fn last_error(&self) -> Option<String> {
        self.gateway.last_error().await
    }

    // ----- authentication -----

    /// Sets the identity provider API key. Returns `false` once
    /// authenticated.
    pub async fn set_api_key(&self, api_key: &str) -> bool {
        self.session.set_api_key(api_key).await
    }

    /// Email/password sign-in; see [`AuthSession::sign_in`].
    ///
    /// # Errors
    /// See [`AuthSession::sign_in`].
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<Identity, AuthError> {
        self.session.sign_in(email, password, remember).await
    }

    /// Auto-login from persisted state; see
    /// [`AuthSession::try_auto_login`].
    ///
    /// # Errors
    /// See [`AuthSession::try_auto_login`].
    pub async fn try_auto_login(&self) -> Result<Identity, AuthError> {
        self.session.try_auto_login().await
    }

    /// Whether the session currently holds a usable token.
    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Email of the signed-in user, empty when unauthenticated.
    pub async fn current_user_email(&self) -> String {
        self.session.current_user_email().await
    }

    /// Clears the session; optionally purges saved credentials.
    pub async fn logout(&self, clear_saved: bool) {
        self.session.logout(clear_saved).await;
    }

    /// Direct access to the session, for callers that need expiry
    /// inspection or custom wiring.
    #[must_use]
    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    // ----- inventory -----

    /// Creates an item; see [`InventoryStore::create_item`].
    ///
    /// # Errors
    /// See [`InventoryStore::create_item`].
    pub async fn create_item(&self, item: &InventoryItem) -> RequestResult<()> {
        self.store.create_item(item).await
    }

    /// All items; see [`InventoryStore::all_items`].
    ///
    /// # Errors
    /// See [`InventoryStore::all_items`].
    pub async fn all_items(&self) -> RequestResult<Vec<InventoryItem>> {
        self.store.all_items().await
    }

    /// Items at a location; see [`InventoryStore::items_at`].
    ///
    /// # Errors
    /// See [`InventoryStore::items_at`].
    pub async fn items_at(
        &self,
        location_id: i32,
        sublocation_id: i32,
    ) -> RequestResult<Vec<InventoryItem>> {
        self.store.items_at(location_id, sublocation_id).await
    }

    /// Updates (possibly renames) an item; see
    /// [`InventoryStore::update_item`].
    ///
    /// # Errors
    /// See [`InventoryStore::update_item`].
    pub async fn update_item(&self, old_name: &str, item: &InventoryItem) -> RequestResult<()> {
        self.store.update_item(old_name, item).await
    }

    /// Deletes an item; see [`InventoryStore::delete_item`].
    ///
    /// # Errors
    /// See [`InventoryStore::delete_item`].
    pub async fn delete_item(&self, name: &str) -> RequestResult<()> {
        self.store.delete_item(name).await
    }

    /// Client-side search; see [`InventoryStore::search`].
    ///
    /// # Errors
    /// See [`InventoryStore::search`].
    pub async fn search(&self, filter: &ItemFilter) -> RequestResult<Vec<InventoryItem>> {
        self.store.search(filter).await
    }

    /// Reads an attribute list; see [`InventoryStore::attributes`].
    ///
    /// # Errors
    /// See [`InventoryStore::attributes`].
    pub async fn attributes(&self, kind: AttributeKind) -> RequestResult<Vec<String>> {
        self.store.attributes(kind).await
    }

    /// Adds an attribute value; see [`InventoryStore::add_attribute`].
    ///
    /// # Errors
    /// See [`InventoryStore::add_attribute`].
    pub async fn add_attribute(&self, kind: AttributeKind, value: &str) -> RequestResult<()> {
        self.store.add_attribute(kind, value).await
    }

    /// Removes an attribute value; see
    /// [`InventoryStore::remove_attribute`].
    ///
    /// # Errors
    /// See [`InventoryStore::remove_attribute`].
    pub async fn remove_attribute(&self, kind: AttributeKind, value: &str) -> RequestResult<()> {
        self.store.remove_attribute(kind, value).await
    }
}
