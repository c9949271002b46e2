//! Storage for the answer-provider API key.
//!
//! The store holds a single opaque string. Absence is not an error at this
//! layer; callers map `None` to the "credential not found" descriptor.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{QuizError, Result};

/// Persistent holder of one credential string.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the stored credential.
    async fn get(&self) -> Result<Option<String>>;

    /// Replaces the stored credential.
    async fn set(&self, key: &str) -> Result<()>;

    /// Deletes the stored credential. Removing a missing credential is not an error.
    async fn remove(&self) -> Result<()>;
}

/// Stores the credential in a single file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Writes the key readable by the owner only on unix.
    async fn write_private(&self, key: &str) -> std::io::Result<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        // An existing file keeps its old mode on open.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        file.write_all(key.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let key = contents.trim();
                Ok((!key.is_empty()).then(|| key.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuizError::credential_store(&self.path, e.to_string())),
        }
    }

    async fn set(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| QuizError::credential_store(&self.path, e.to_string()))?;
        }
        self.write_private(key.trim())
            .await
            .map_err(|e| QuizError::credential_store(&self.path, e.to_string()))?;
        tracing::info!(path = %self.path.display(), "Saved API key");
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Removed API key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QuizError::credential_store(&self.path, e.to_string())),
        }
    }
}

/// Keeps the credential in memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `key`.
    #[must_use]
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(Some(key.into())),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.key.read().await.clone())
    }

    async fn set(&self, key: &str) -> Result<()> {
        *self.key.write().await = Some(key.trim().to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.key.write().await = None;
        Ok(())
    }
}
