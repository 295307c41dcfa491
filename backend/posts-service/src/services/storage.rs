//! Uploaded image storage.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("reference outside upload directory: {0}")]
    InvalidReference(String),

    #[error("file storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map an accepted content type to its file extension.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpeg"),
        _ => None,
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist the image and return its reference.
    async fn save(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    async fn remove(&self, reference: &str) -> Result<(), StorageError>;
}

/// Stores images as files under one directory. References are the file paths.
pub struct LocalFileStorage {
    dir: PathBuf,
    max_bytes: usize,
}

impl LocalFileStorage {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| StorageError::UnsupportedType(content_type.to_string()))?;
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                max: self.max_bytes,
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.{}", Uuid::new_v4(), ext));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), "image stored");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, reference: &str) -> Result<(), StorageError> {
        let path = Path::new(reference);
        if path.parent() != Some(self.dir.as_path()) {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }

        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

/// Remove an image, logging instead of failing.
pub async fn release_best_effort(storage: &dyn FileStorage, reference: Option<&str>) {
    let Some(reference) = reference.filter(|r| !r.is_empty()) else {
        return;
    };

    if let Err(e) = storage.remove(reference).await {
        tracing::warn!(reference, error = %e, "failed to release stored image");
    }
}
