//! Filesystem object-storage backend

use super::ObjectStorage;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Object storage rooted at a local directory
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object path under the root, rejecting traversal
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(Error::Storage(format!("Invalid object path: {}", path)));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ObjectStorage for FsStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("create dir for {}: {}", path, e)))?;
        }

        // Write to a sibling temp file, then rename so readers never
        // observe a half-written object.
        let tmp = full.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| Error::Storage(format!("write {}: {}", path, e)))?;
        tokio::fs::rename(&tmp, &full)
            .await
            .map_err(|e| Error::Storage(format!("commit {}: {}", path, e)))?;

        debug!("Stored {} bytes at {}", bytes.len(), path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| Error::Storage(format!("read {}: {}", path, e)))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full)
            .await
            .map_err(|e| Error::Storage(format!("stat {}: {}", path, e)))?)
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Storage(format!("delete {}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_exists_delete() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path());

        let path = "2024/06/01/c1/batch-0.json";
        assert!(!storage.exists(path).await.unwrap());

        storage.put(path, b"payload").await.unwrap();
        assert!(storage.exists(path).await.unwrap());
        assert_eq!(storage.get(path).await.unwrap(), b"payload");

        assert!(storage.delete(path).await.unwrap());
        assert!(!storage.exists(path).await.unwrap());
        // Deleting again is a no-op, not an error
        assert!(!storage.delete(path).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path());

        storage.put("a/b.json", b"one").await.unwrap();
        storage.put("a/b.json", b"two").await.unwrap();
        assert_eq!(storage.get("a/b.json").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let tmp = TempDir::new().unwrap();
        let storage = FsStorage::new(tmp.path());

        assert!(storage.put("../escape.json", b"x").await.is_err());
        assert!(storage.get("/etc/passwd").await.is_err());
    }
}
