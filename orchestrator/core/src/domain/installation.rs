// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Installation Value Objects
//!
//! [`InstallationConfig`] is the resolved, validated input of one installation.
//! It is built once by the configuration layer and never mutated afterwards.
//!
//! [`ServiceProfile`] holds everything that is specific to the managed
//! protocol (file names, download URL shape, subscription scheme). Supporting
//! another protocol means supplying another profile, not widening the
//! placeholder set of the templater.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::work_dir::{CERT_FILE_NAME, KEY_FILE_NAME, LAUNCH_SCRIPT_NAME, LEGACY_CERT_ARTIFACTS};

/// Resolved installation parameters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationConfig {
    pub domain: String,
    pub listen_port: u16,
    /// Names the subscription file; UUID in production.
    pub identity_id: String,
    pub shared_secret: String,
    pub service_version: String,
    pub remarks_prefix: String,
}

// Hand-written so the shared secret never ends up in logs.
impl fmt::Debug for InstallationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationConfig")
            .field("domain", &self.domain)
            .field("listen_port", &self.listen_port)
            .field("identity_id", &self.identity_id)
            .field("shared_secret", &"***")
            .field("service_version", &self.service_version)
            .field("remarks_prefix", &self.remarks_prefix)
            .finish()
    }
}

/// Characters that would corrupt the subscription URI if inserted unescaped.
pub const FORBIDDEN_SECRET_CHARS: &[char] = &['@', ':', '#', '/', '?'];

impl InstallationConfig {
    /// Check the invariants the installer relies on.
    ///
    /// The identity id names a file next to the artifacts described by
    /// `profile`, so the profile decides which names are taken.
    pub fn validate(&self, profile: &ServiceProfile) -> Result<(), String> {
        if self.domain.trim().is_empty() {
            return Err("domain cannot be empty".to_string());
        }
        if self.domain.chars().any(|c| c.is_whitespace() || c == '/' || c == '@') {
            return Err(format!("domain '{}' is not a valid host name", self.domain));
        }
        Self::check_listen_port(self.listen_port)?;
        Self::check_identity_id(&self.identity_id, profile)?;
        Self::check_shared_secret(&self.shared_secret)?;
        if self.service_version.trim().is_empty() {
            return Err("service version cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn check_listen_port(port: u16) -> Result<(), String> {
        if port == 0 {
            return Err("listen port must be between 1 and 65535".to_string());
        }
        Ok(())
    }

    /// The subscription file is written to `<work_dir>/<identity_id>`; the id
    /// must be a plain file name that no other artifact already uses.
    pub fn check_identity_id(identity_id: &str, profile: &ServiceProfile) -> Result<(), String> {
        if identity_id.is_empty()
            || identity_id == "."
            || identity_id == ".."
            || identity_id.contains('/')
            || identity_id.contains('\0')
        {
            return Err(format!("identity id '{}' cannot be used as a file name", identity_id));
        }
        if profile.artifact_file_names().contains(&identity_id) {
            return Err(format!(
                "identity id '{}' collides with an artifact in the work directory",
                identity_id
            ));
        }
        Ok(())
    }

    pub fn check_shared_secret(secret: &str) -> Result<(), String> {
        if secret.is_empty() {
            return Err("shared secret cannot be empty".to_string());
        }
        if let Some(c) = secret
            .chars()
            .find(|c| FORBIDDEN_SECRET_CHARS.contains(c) || c.is_whitespace())
        {
            return Err(format!(
                "shared secret contains '{}', which cannot appear unescaped in a subscription URI",
                c.escape_default()
            ));
        }
        Ok(())
    }
}

/// Host CPU bucket used to pick a release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Arm64,
    Amd64,
}

impl Architecture {
    /// Map a Rust target arch name onto one of the two buckets.
    pub fn from_target_arch(arch: &str) -> Self {
        match arch {
            "aarch64" | "arm64" => Architecture::Arm64,
            _ => Architecture::Amd64,
        }
    }

    /// Architecture of the running host.
    pub fn detect() -> Self {
        Self::from_target_arch(std::env::consts::ARCH)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::Amd64 => "amd64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

pub const DEFAULT_DOWNLOAD_URL_TEMPLATE: &str =
    "https://github.com/apernet/hysteria/releases/download/app/v{version}/hysteria-linux-{arch}";

/// Protocol-specific knobs of the managed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProfile {
    /// File name of the downloaded executable inside the work directory.
    pub binary_name: String,
    /// File name of the rendered configuration.
    pub config_name: String,
    /// Arguments passed to the binary ahead of the config path.
    pub launch_args: Vec<String>,
    /// Flag introducing the config path on the command line.
    pub config_flag: String,
    /// Download location with `{version}` and `{arch}` tokens.
    pub download_url_template: String,
    /// URI scheme of the subscription record.
    pub subscription_scheme: String,
    /// Suffix appended to the remarks prefix in the subscription fragment.
    pub service_tag: String,
    /// Literal in the template replaced by `:<listen_port>`.
    pub sentinel_port: String,
}

impl ServiceProfile {
    pub fn hysteria2() -> Self {
        Self {
            binary_name: "hysteria".to_string(),
            config_name: "hysteria2-config.json".to_string(),
            launch_args: vec!["server".to_string()],
            config_flag: "-c".to_string(),
            download_url_template: DEFAULT_DOWNLOAD_URL_TEMPLATE.to_string(),
            subscription_scheme: "hysteria2".to_string(),
            service_tag: "hysteria2".to_string(),
            sentinel_port: ":10008".to_string(),
        }
    }

    /// Every file name the installer, provisioner and reaper manage in the
    /// work directory, legacy certificate intermediates included.
    pub fn artifact_file_names(&self) -> Vec<&str> {
        let mut names = vec![
            self.binary_name.as_str(),
            self.config_name.as_str(),
            LAUNCH_SCRIPT_NAME,
            CERT_FILE_NAME,
            KEY_FILE_NAME,
        ];
        names.extend_from_slice(LEGACY_CERT_ARTIFACTS);
        names
    }

    pub fn with_download_url_template(mut self, template: impl Into<String>) -> Self {
        self.download_url_template = template.into();
        self
    }

    /// Expand the download template for a version and architecture.
    pub fn download_url(&self, version: &str, arch: Architecture) -> Result<String, String> {
        if !self.download_url_template.contains("{version}") {
            return Err(format!(
                "download URL template '{}' has no {{version}} token",
                self.download_url_template
            ));
        }
        if !self.download_url_template.contains("{arch}") {
            return Err(format!(
                "download URL template '{}' has no {{arch}} token",
                self.download_url_template
            ));
        }
        let version = version.trim().trim_start_matches('v');
        Ok(self
            .download_url_template
            .replace("{version}", version)
            .replace("{arch}", arch.tag()))
    }
}

impl Default for ServiceProfile {
    fn default() -> Self {
        Self::hysteria2()
    }
}
