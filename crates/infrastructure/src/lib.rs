//! Homevault Infrastructure - Adapters
//!
//! Concrete implementations of the application-layer ports: a reqwest
//! HTTP transport, the system clock, and a file-backed credential
//! store.

pub mod adapters;
pub mod persistence;

pub use adapters::{ReqwestTransport, SystemClock};
pub use persistence::FileCredentialStore;
