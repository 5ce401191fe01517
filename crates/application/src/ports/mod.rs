//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the application core and
//! external systems. Each port is a trait implemented by an adapter in
//! the infrastructure layer, or by a mock in tests.

mod clock;
mod credentials;
mod transport;

pub use clock::Clock;
pub use credentials::{CredentialError, CredentialStore, SavedCredentials};
pub use transport::{
    DEFAULT_TIMEOUT, HttpTransport, TransportError, TransportRequest, TransportResponse,
};
