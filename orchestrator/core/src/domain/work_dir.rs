// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Work directory layout.
//!
//! All artifacts of one installation live flat in a single directory. The
//! presence of the binary is the "installed" flag read by the supervisor; the
//! reaper removing it is what stops future restarts.

use std::path::{Path, PathBuf};

use crate::domain::installation::ServiceProfile;

pub const LAUNCH_SCRIPT_NAME: &str = "startup.sh";
pub const CERT_FILE_NAME: &str = "hysteria.crt";
pub const KEY_FILE_NAME: &str = "hysteria.key";

/// Intermediates written by keytool-based releases; removed on re-install.
pub const LEGACY_CERT_ARTIFACTS: &[&str] = &["hysteria.jks", "hysteria.der", "hysteria.p12"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDirectory {
    root: PathBuf,
    binary_name: String,
    config_name: String,
}

impl WorkDirectory {
    pub fn new(root: impl Into<PathBuf>, profile: &ServiceProfile) -> Self {
        Self {
            root: root.into(),
            binary_name: profile.binary_name.clone(),
            config_name: profile.config_name.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root.join(&self.binary_name)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(&self.config_name)
    }

    pub fn launch_script_path(&self) -> PathBuf {
        self.root.join(LAUNCH_SCRIPT_NAME)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.root.join(CERT_FILE_NAME)
    }

    pub fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE_NAME)
    }

    pub fn subscription_path(&self, identity_id: &str) -> PathBuf {
        self.root.join(identity_id)
    }

    /// The five files removed by the reaper, in deletion order.
    pub fn reapable_artifacts(&self) -> [PathBuf; 5] {
        [
            self.binary_path(),
            self.config_path(),
            self.launch_script_path(),
            self.cert_path(),
            self.key_path(),
        ]
    }

    /// Certificate material, current and legacy, cleared before regeneration.
    pub fn certificate_artifacts(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = LEGACY_CERT_ARTIFACTS
            .iter()
            .map(|name| self.root.join(name))
            .collect();
        paths.push(self.cert_path());
        paths.push(self.key_path());
        paths
    }
}
