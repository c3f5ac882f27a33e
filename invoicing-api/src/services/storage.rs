use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::ServiceError;

/// Blob store for uploaded business logos.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    /// URL under which a stored key is publicly served.
    fn public_url(&self, key: &str) -> String;
}

/// Files on local disk, served read-only by the HTTP layer.
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(Self {
            base_path,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve a key below the base path, rejecting anything that escapes it.
    fn resolve(&self, key: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::Storage(format!("Invalid storage key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        fs::write(path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads/").await.unwrap();

        storage
            .upload("logos/ws-1/logo.png", vec![1, 2, 3])
            .await
            .unwrap();
        let path = dir.path().join("logos/ws-1/logo.png");
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            storage.public_url("logos/ws-1/logo.png"),
            "/uploads/logos/ws-1/logo.png"
        );

        storage.delete("logos/ws-1/logo.png").await.unwrap();
        assert!(!path.exists());
        // deleting twice is fine
        storage.delete("logos/ws-1/logo.png").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_outside_base() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/uploads").await.unwrap();

        assert!(storage.upload("../escape.png", vec![0]).await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }
}
