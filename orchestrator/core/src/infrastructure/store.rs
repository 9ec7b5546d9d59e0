// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Artifact Store
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Implements `ArtifactStore` on top of `tokio::fs`
//! - **Integration:** Installer / Supervisor / Reaper → Local disk

use std::path::Path;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::domain::artifact::ArtifactStore;
use crate::domain::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct LocalArtifactStore;

impl LocalArtifactStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn create_dir_all(&self, path: &Path) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StoreError::new("create directory", path, e))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| StoreError::new("write", path, e))
    }

    async fn write_file_with_mode(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), StoreError> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(mode);
        let mut file = options
            .open(path)
            .await
            .map_err(|e| StoreError::new("create", path, e))?;

        // The creation mode only applies to new files; a truncated existing
        // file keeps its old bits until they are reset here.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| StoreError::new("set permissions on", path, e))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        file.write_all(contents)
            .await
            .map_err(|e| StoreError::new("write", path, e))?;
        file.flush().await.map_err(|e| StoreError::new("write", path, e))
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, StoreError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::new("read", path, e))
    }

    #[cfg(unix)]
    async fn set_mode(&self, path: &Path, mode: u32) -> Result<(), StoreError> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| StoreError::new("set permissions on", path, e))
    }

    #[cfg(not(unix))]
    async fn set_mode(&self, path: &Path, _mode: u32) -> Result<(), StoreError> {
        // Only existence is checked; mode bits have no meaning here.
        tokio::fs::metadata(path)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::new("set permissions on", path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn remove_file(&self, path: &Path) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::new("remove", path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new();
        let path = dir.path().join("nested").join("file.txt");

        store.create_dir_all(path.parent().unwrap()).await.unwrap();
        store.write_file(&path, b"hello").await.unwrap();
        assert!(store.exists(&path).await);
        assert_eq!(store.read_to_string(&path).await.unwrap(), "hello");

        assert!(store.remove_file(&path).await.unwrap());
        assert!(!store.exists(&path).await);
        // Removing again reports absence instead of failing.
        assert!(!store.remove_file(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalArtifactStore::new()
            .read_to_string(&dir.path().join("absent"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("absent"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_set_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new();
        let path = dir.path().join("key.pem");
        store.write_file(&path, b"secret").await.unwrap();
        store.set_mode(&path, 0o600).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_file_with_mode_tightens_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new();
        let fresh = dir.path().join("fresh.key");
        let existing = dir.path().join("existing.key");
        std::fs::write(&existing, b"old contents that are longer").unwrap();
        std::fs::set_permissions(&existing, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.write_file_with_mode(&fresh, b"secret", 0o600).await.unwrap();
        store.write_file_with_mode(&existing, b"secret", 0o600).await.unwrap();

        for path in [&fresh, &existing] {
            let mode = std::fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", path.display());
            assert_eq!(std::fs::read(path).unwrap(), b"secret");
        }
    }
}
