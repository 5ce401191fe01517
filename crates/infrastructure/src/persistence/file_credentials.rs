//! File-based credential store implementation.
//!
//! Stores the "remember me" email/password pair and the refresh token
//! as plaintext JSON in the user config directory, restricted to the
//! owning user (0600 on unix). Deployments that need stronger
//! protection should implement the `CredentialStore` port over an OS
//! keychain instead.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use homevault_application::ports::{CredentialError, CredentialStore, SavedCredentials};

/// On-disk shape of the credential file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Credential store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store at `<config dir>/homevault/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform exposes no user config
    /// directory.
    pub fn from_default_location() -> Result<Self, CredentialError> {
        let base = dirs::config_dir().ok_or_else(|| {
            CredentialError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no user config directory",
            ))
        })?;
        Ok(Self::with_path(base.join("homevault").join("credentials.json")))
    }

    /// Store at an explicit path.
    #[must_use]
    pub const fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_file(&self) -> Result<CredentialFile, CredentialError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| CredentialError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, file: &CredentialFile) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(file)
            .map_err(|e| CredentialError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, payload).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn has_saved(&self) -> bool {
        matches!(
            self.read_file().await,
            Ok(CredentialFile {
                email: Some(_),
                password: Some(_),
                ..
            })
        )
    }

    async fn save(&self, email: &str, password: &str) -> Result<(), CredentialError> {
        let mut file = self.read_file().await?;
        file.email = Some(email.to_string());
        file.password = Some(password.to_string());
        self.write_file(&file).await?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    async fn load(&self) -> Result<Option<SavedCredentials>, CredentialError> {
        let file = self.read_file().await?;
        Ok(match (file.email, file.password) {
            (Some(email), Some(password)) => Some(SavedCredentials { email, password }),
            _ => None,
        })
    }

    async fn clear(&self) -> Result<(), CredentialError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_refresh_token(&self, token: &str) -> Result<(), CredentialError> {
        let mut file = self.read_file().await?;
        file.refresh_token = Some(token.to_string());
        self.write_file(&file).await
    }

    async fn load_refresh_token(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.read_file().await?.refresh_token)
    }
}
