// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Error Taxonomy
//!
//! One `thiserror` enum per failure family. Application services wrap the
//! leaf errors; only [`InstallationFailedError`] crosses the installer
//! boundary, and it always names the step that failed.
//!
//! | Error | Raised by |
//! |-------|-----------|
//! | [`FetchError`] | `ArtifactFetcher` implementations |
//! | [`StoreError`] | `ArtifactStore` implementations |
//! | [`CertGenerationError`] | `CertificateBackend`, `CertificateProvisioner` |
//! | [`TemplateError`] | `TemplateSource`, `ConfigTemplater` |
//! | [`InstallationFailedError`] | `ArtifactInstaller` |
//! | [`ProcessLaunchError`] | `ProcessLauncher` |

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response from {url} was empty")]
    EmptyBody { url: String },
}

#[derive(Debug, Error)]
#[error("failed to {operation} {}: {source}", path.display())]
pub struct StoreError {
    pub operation: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl StoreError {
    pub fn new(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Whether the underlying cause was a missing file.
    pub fn is_not_found(&self) -> bool {
        self.source.kind() == std::io::ErrorKind::NotFound
    }
}

#[derive(Debug, Error)]
pub enum CertGenerationError {
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),

    #[error("certificate signing failed: {0}")]
    Signing(String),

    #[error("invalid certificate parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Io(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("config template unavailable from {origin}: {reason}")]
    TemplateMissing { origin: String, reason: String },

    #[error("rendered config is invalid: {0}")]
    RenderError(String),
}

/// Installer pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    PrepareWorkDir,
    ResolveDownloadUrl,
    FetchBinary,
    WriteBinary,
    MarkBinaryExecutable,
    ProvisionCertificate,
    RenderConfig,
    WriteLaunchScript,
    MarkScriptExecutable,
    PublishSubscription,
}

impl InstallStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallStep::PrepareWorkDir => "prepare_work_dir",
            InstallStep::ResolveDownloadUrl => "resolve_download_url",
            InstallStep::FetchBinary => "fetch_binary",
            InstallStep::WriteBinary => "write_binary",
            InstallStep::MarkBinaryExecutable => "mark_binary_executable",
            InstallStep::ProvisionCertificate => "provision_certificate",
            InstallStep::RenderConfig => "render_config",
            InstallStep::WriteLaunchScript => "write_launch_script",
            InstallStep::MarkScriptExecutable => "mark_script_executable",
            InstallStep::PublishSubscription => "publish_subscription",
        }
    }
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root cause carried by [`InstallationFailedError`].
#[derive(Debug, Error)]
pub enum InstallCause {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Certificate(#[from] CertGenerationError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
#[error("installation failed at step '{step}': {source}")]
pub struct InstallationFailedError {
    pub step: InstallStep,
    #[source]
    pub source: InstallCause,
}

impl InstallationFailedError {
    pub fn new(step: InstallStep, source: impl Into<InstallCause>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessLaunchError {
    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {}: {source}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open output sink {}: {source}", path.display())]
    OutputSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_error_names_step_and_cause() {
        let err = InstallationFailedError::new(
            InstallStep::FetchBinary,
            FetchError::Status {
                url: "https://example.invalid/bin".to_string(),
                status: 404,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("fetch_binary"));
        assert!(msg.contains("HTTP 404"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_store_error_not_found_detection() {
        let err = StoreError::new(
            "remove",
            "/tmp/missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("failed to remove /tmp/missing"));
    }
}
