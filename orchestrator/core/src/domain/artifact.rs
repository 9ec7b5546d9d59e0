// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Artifact I/O Ports
//!
//! The installer, supervisor and reaper never touch the network or the
//! filesystem directly. They go through these two traits so tests can run the
//! full pipeline against an in-memory fetcher and a temporary directory.
//!
//! | Trait | Production implementation |
//! |-------|---------------------------|
//! | [`ArtifactFetcher`] | `infrastructure::fetcher::HttpArtifactFetcher` |
//! | [`ArtifactStore`] | `infrastructure::store::LocalArtifactStore` |

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::error::{FetchError, StoreError};

/// Mode for downloaded binaries and the launch script.
pub const EXECUTABLE_MODE: u32 = 0o755;
/// Mode for the certificate and other world-readable artifacts.
pub const PUBLIC_FILE_MODE: u32 = 0o644;
/// Mode for the private key.
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Byte-level HTTP GET.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Byte-level filesystem primitives scoped to what installation needs.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<(), StoreError>;

    /// Create or truncate `path` with `contents`.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError>;

    /// Create or truncate `path` with `contents`, holding `mode` before any
    /// byte is written. Used for material that must never be world-readable.
    async fn write_file_with_mode(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), StoreError>;

    async fn read_to_string(&self, path: &Path) -> Result<String, StoreError>;

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<(), StoreError>;

    async fn exists(&self, path: &Path) -> bool;

    /// Remove a file. `Ok(false)` when it was already absent.
    async fn remove_file(&self, path: &Path) -> Result<bool, StoreError>;
}
