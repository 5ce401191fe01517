//! Credential store port
//!
//! Persists the "remember me" email/password pair and the long-lived
//! refresh token between runs. The application core does not care how
//! the adapter protects them; a production adapter should sit on an OS
//! keychain.

use async_trait::async_trait;
use thiserror::Error;

/// A saved email/password pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCredentials {
    /// Saved account email.
    pub email: String,
    /// Saved account password.
    pub password: String,
}

/// Errors from the credential store adapter.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting login credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether an email/password pair is currently saved.
    async fn has_saved(&self) -> bool;

    /// Saves the email/password pair, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    async fn save(&self, email: &str, password: &str) -> Result<(), CredentialError>;

    /// Loads the saved pair, or `None` when nothing is saved.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    async fn load(&self) -> Result<Option<SavedCredentials>, CredentialError>;

    /// Removes everything, refresh token included.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    async fn clear(&self) -> Result<(), CredentialError>;

    /// Saves the refresh token for password-less auto-login.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be written.
    async fn save_refresh_token(&self, token: &str) -> Result<(), CredentialError>;

    /// Loads the saved refresh token, or `None` when absent.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    async fn load_refresh_token(&self) -> Result<Option<String>, CredentialError>;
}
