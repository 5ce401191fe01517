//! Homevault Application layer
//!
//! The authenticated-request core: `AuthSession` owns tokens and talks
//! to the identity provider, `RequestGateway` attaches tokens to data
//! requests and retries once after a refresh, `InventoryStore` builds
//! the CRUD surface on top, and `DatabaseClient` ties them together.
//! External systems are reached only through the port traits in
//! [`ports`].

pub mod client;
pub mod events;
pub mod gateway;
pub mod ports;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::DatabaseClient;
pub use events::{NullEvents, SessionEvents};
pub use gateway::RequestGateway;
pub use session::{AuthSession, SessionConfig};
pub use store::InventoryStore;
