//! Persistence adapters.

mod file_credentials;

pub use file_credentials::FileCredentialStore;
