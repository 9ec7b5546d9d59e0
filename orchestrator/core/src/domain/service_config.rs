// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a hyvisor node, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Installation identity (domain, port, uuid, password, version)
// - Download and template sources
// - Certificate, supervisor and reaper settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::certificate::{DEFAULT_SUBJECT_CN, DEFAULT_VALIDITY_DAYS};
use crate::domain::installation::{InstallationConfig, ServiceProfile, DEFAULT_DOWNLOAD_URL_TEMPLATE};
use crate::domain::supervisor::{ChildOutput, DEFAULT_BACKOFF};
use crate::domain::template::DEFAULT_MASQUERADE_LITERAL;

pub const API_VERSION: &str = "hyvisor/v1";
pub const KIND: &str = "ServiceConfig";

/// Top-level Kubernetes-style service configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "hyvisor/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: ServiceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub installation: InstallationSettings,

    /// Directory holding every artifact of the installation
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default)]
    pub download: DownloadSettings,

    #[serde(default)]
    pub template: TemplateSettings,

    #[serde(default)]
    pub certificate: CertificateSettings,

    #[serde(default)]
    pub supervisor: SupervisorSettings,

    #[serde(default)]
    pub reaper: ReaperSettings,
}

/// Raw installation values; missing ones are filled in by `resolve_installation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Identity id; names the subscription file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Service release to download, e.g. "2.6.0"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// URL with {version} and {arch} tokens
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSourceKind {
    /// Template packaged into the binary
    #[default]
    Embedded,
    File,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(default)]
    pub source: TemplateSourceKind,

    /// Path or URL, depending on `source`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Literal that must come through rendering untouched
    #[serde(default = "default_protected_literal")]
    pub protected_literal: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            source: TemplateSourceKind::default(),
            location: None,
            protected_literal: default_protected_literal(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSettings {
    #[serde(default = "default_subject_cn")]
    pub subject_cn: String,

    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            subject_cn: default_subject_cn(),
            validity_days: default_validity_days(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Discard,
    Inherit,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Delay between a failed run and the next launch
    #[serde(default = "default_backoff", with = "humantime_serde")]
    pub backoff: Duration,

    #[serde(default)]
    pub output: OutputMode,

    /// Required when `output` is `file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            backoff: default_backoff(),
            output: OutputMode::default(),
            output_file: None,
        }
    }
}

impl SupervisorSettings {
    pub fn child_output(&self) -> anyhow::Result<ChildOutput> {
        match self.output {
            OutputMode::Discard => Ok(ChildOutput::Discard),
            OutputMode::Inherit => Ok(ChildOutput::Inherit),
            OutputMode::File => self
                .output_file
                .clone()
                .map(ChildOutput::File)
                .ok_or_else(|| anyhow::anyhow!("spec.supervisor.output_file is required when output is 'file'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time after installation at which artifacts are deleted
    #[serde(default = "default_reap_delay", with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: default_reap_delay(),
        }
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./hysteria")
}

fn default_url_template() -> String {
    DEFAULT_DOWNLOAD_URL_TEMPLATE.to_string()
}

fn default_protected_literal() -> String {
    DEFAULT_MASQUERADE_LITERAL.to_string()
}

fn default_subject_cn() -> String {
    DEFAULT_SUBJECT_CN.to_string()
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

fn default_backoff() -> Duration {
    DEFAULT_BACKOFF
}

fn default_reap_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

pub const DEFAULT_DOMAIN: &str = "localhost";
pub const DEFAULT_SERVICE_VERSION: &str = "2.5.2";
pub const DEFAULT_REMARKS_PREFIX: &str = "hyvisor";

impl Default for ServiceConfigSpec {
    fn default() -> Self {
        Self {
            installation: InstallationSettings::default(),
            work_dir: default_work_dir(),
            download: DownloadSettings::default(),
            template: TemplateSettings::default(),
            certificate: CertificateSettings::default(),
            supervisor: SupervisorSettings::default(),
            reaper: ReaperSettings::default(),
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hysteria2".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HYVISOR_CONFIG_PATH environment variable
    /// 2. ./hyvisor.yaml (working directory)
    /// 3. ~/.hyvisor/config.yaml (user home)
    /// 4. /etc/hyvisor/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HYVISOR_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hyvisor.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hyvisor").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/hyvisor/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // 1. Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        // 2. Discovery (Env -> Cwd -> Home -> System)
        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let install = &mut self.spec.installation;

        if let Some(val) = lookup("HYVISOR_DOMAIN") {
            tracing::info!("Environment override: HYVISOR_DOMAIN={}", val);
            install.domain = Some(val);
        }
        if let Some(val) = lookup("HYVISOR_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: HYVISOR_PORT={}", port);
                    install.port = Some(port);
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for HYVISOR_PORT: '{}'. Expected a port number. Ignoring.",
                        val
                    );
                }
            }
        }
        if let Some(val) = lookup("HYVISOR_UUID") {
            tracing::info!("Environment override: HYVISOR_UUID={}", val);
            install.uuid = Some(val);
        }
        if let Some(val) = lookup("HYVISOR_PASSWORD") {
            tracing::info!("Environment override: HYVISOR_PASSWORD=***");
            install.password = Some(val);
        }
        if let Some(val) = lookup("HYVISOR_VERSION") {
            tracing::info!("Environment override: HYVISOR_VERSION={}", val);
            install.version = Some(val);
        }
        if let Some(val) = lookup("HYVISOR_REMARKS_PREFIX") {
            tracing::info!("Environment override: HYVISOR_REMARKS_PREFIX={}", val);
            install.remarks_prefix = Some(val);
        }
        if let Some(val) = lookup("HYVISOR_WORK_DIR") {
            tracing::info!("Environment override: HYVISOR_WORK_DIR={}", val);
            self.spec.work_dir = PathBuf::from(val);
        }
    }

    /// Fill in generated defaults for missing identity values.
    ///
    /// Only values that are absent are generated, so calling this twice is a
    /// no-op the second time. Callers that want the generated identity to
    /// survive restarts persist the manifest afterwards.
    pub fn fill_generated_defaults(&mut self) {
        let install = &mut self.spec.installation;
        if install.uuid.is_none() {
            install.uuid = Some(uuid::Uuid::new_v4().to_string());
        }
        if install.password.is_none() {
            let generated = uuid::Uuid::new_v4().simple().to_string();
            install.password = Some(generated[..8].to_string());
        }
    }

    /// Build the immutable installation record from the manifest.
    pub fn resolve_installation(&self) -> anyhow::Result<InstallationConfig> {
        let install = &self.spec.installation;
        let listen_port = install
            .port
            .ok_or_else(|| anyhow::anyhow!("spec.installation.port must be set"))?;
        let identity_id = install.uuid.clone().ok_or_else(|| {
            anyhow::anyhow!("spec.installation.uuid must be set (or generated)")
        })?;
        let shared_secret = install.password.clone().ok_or_else(|| {
            anyhow::anyhow!("spec.installation.password must be set (or generated)")
        })?;

        let cfg = InstallationConfig {
            domain: install.domain.clone().unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            listen_port,
            identity_id,
            shared_secret,
            service_version: install
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVICE_VERSION.to_string()),
            remarks_prefix: install
                .remarks_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_REMARKS_PREFIX.to_string()),
        };
        cfg.validate(&self.service_profile())
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(cfg)
    }

    /// Service profile with the configured download location applied.
    pub fn service_profile(&self) -> ServiceProfile {
        ServiceProfile::hysteria2().with_download_url_template(self.spec.download.url_template.clone())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.work_dir.as_os_str().is_empty() {
            anyhow::bail!("spec.work_dir cannot be empty");
        }

        let template = &self.spec.download.url_template;
        if !template.contains("{version}") || !template.contains("{arch}") {
            anyhow::bail!(
                "spec.download.url_template must contain {{version}} and {{arch}}: '{}'",
                template
            );
        }

        match self.spec.template.source {
            TemplateSourceKind::Embedded => {}
            TemplateSourceKind::File | TemplateSourceKind::Url => {
                if self.spec.template.location.as_deref().unwrap_or("").is_empty() {
                    anyhow::bail!("spec.template.location is required for a file or url template source");
                }
            }
        }

        if self.spec.certificate.subject_cn.is_empty() {
            anyhow::bail!("spec.certificate.subject_cn cannot be empty");
        }
        if self.spec.certificate.validity_days == 0 {
            anyhow::bail!("spec.certificate.validity_days must be positive");
        }

        self.spec.supervisor.child_output()?;

        // Same rules as the resolved record, applied to whichever values are set.
        let install = &self.spec.installation;
        if let Some(port) = install.port {
            InstallationConfig::check_listen_port(port)
                .map_err(|e| anyhow::anyhow!("spec.installation.port: {}", e))?;
        }
        if let Some(uuid) = &install.uuid {
            InstallationConfig::check_identity_id(uuid, &self.service_profile())
                .map_err(|e| anyhow::anyhow!("spec.installation.uuid: {}", e))?;
        }
        if let Some(password) = &install.password {
            InstallationConfig::check_shared_secret(password)
                .map_err(|e| anyhow::anyhow!("spec.installation.password: {}", e))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_manifest() {
        let manifest = ServiceConfigManifest::default();
        assert_eq!(manifest.api_version, "hyvisor/v1");
        assert_eq!(manifest.kind, "ServiceConfig");
        assert_eq!(manifest.spec.supervisor.backoff, Duration::from_secs(3));
        assert_eq!(manifest.spec.reaper.delay, Duration::from_secs(30));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing_with_durations() {
        let yaml = r#"
apiVersion: hyvisor/v1
kind: ServiceConfig
metadata:
  name: edge-1
spec:
  installation:
    domain: example.com
    port: 8443
    uuid: abc-123
    password: s3cret
    version: 2.6.0
    remarks_prefix: demo
  work_dir: /srv/hyvisor
  supervisor:
    backoff: 500ms
    output: inherit
  reaper:
    delay: 2m
"#;
        let manifest = ServiceConfigManifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_ok());
        assert_eq!(manifest.spec.supervisor.backoff, Duration::from_millis(500));
        assert_eq!(manifest.spec.reaper.delay, Duration::from_secs(120));
        assert_eq!(manifest.spec.supervisor.child_output().unwrap(), ChildOutput::Inherit);

        let cfg = manifest.resolve_installation().unwrap();
        assert_eq!(cfg.domain, "example.com");
        assert_eq!(cfg.listen_port, 8443);
        assert_eq!(cfg.identity_id, "abc-123");
        assert_eq!(cfg.service_version, "2.6.0");
    }

    #[test]
    fn test_generated_defaults() {
        let mut manifest = ServiceConfigManifest::default();
        manifest.spec.installation.port = Some(443);
        manifest.fill_generated_defaults();

        let cfg = manifest.resolve_installation().unwrap();
        assert_eq!(cfg.domain, DEFAULT_DOMAIN);
        assert_eq!(cfg.service_version, DEFAULT_SERVICE_VERSION);
        assert_eq!(cfg.shared_secret.len(), 8);
        assert!(uuid::Uuid::parse_str(&cfg.identity_id).is_ok());

        // Second call keeps the identity stable.
        let before = manifest.spec.installation.uuid.clone();
        manifest.fill_generated_defaults();
        assert_eq!(manifest.spec.installation.uuid, before);
    }

    #[test]
    fn test_missing_port_is_rejected() {
        let mut manifest = ServiceConfigManifest::default();
        manifest.fill_generated_defaults();
        assert!(manifest.resolve_installation().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("HYVISOR_PORT", "9443"),
            ("HYVISOR_DOMAIN", "override.example"),
            ("HYVISOR_WORK_DIR", "/tmp/hy"),
        ]);
        let mut manifest = ServiceConfigManifest::default();
        manifest.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(manifest.spec.installation.port, Some(9443));
        assert_eq!(manifest.spec.installation.domain.as_deref(), Some("override.example"));
        assert_eq!(manifest.spec.work_dir, PathBuf::from("/tmp/hy"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut manifest = ServiceConfigManifest::default();
        manifest.apply_overrides(|k| (k == "HYVISOR_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(manifest.spec.installation.port, None);
    }

    #[test]
    fn test_validation() {
        let mut manifest = ServiceConfigManifest::default();
        assert!(manifest.validate().is_ok());

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.spec.download.url_template = "https://example.invalid/{version}".to_string();
        assert!(manifest.validate().is_err());
        manifest.spec.download.url_template = default_url_template();

        manifest.spec.template.source = TemplateSourceKind::Url;
        assert!(manifest.validate().is_err());
        manifest.spec.template.location = Some("https://example.invalid/t.json".to_string());
        assert!(manifest.validate().is_ok());

        manifest.spec.supervisor.output = OutputMode::File;
        assert!(manifest.validate().is_err());
        manifest.spec.supervisor.output_file = Some(PathBuf::from("/tmp/hyvisor.log"));
        assert!(manifest.validate().is_ok());

        manifest.spec.installation.password = Some("p@ss".to_string());
        assert!(manifest.validate().is_err());
        manifest.spec.installation.password = Some("pass".to_string());

        manifest.spec.installation.uuid = Some("../escape".to_string());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_uuid_naming_an_artifact_is_rejected() {
        for name in ["startup.sh", "hysteria"] {
            let mut manifest = ServiceConfigManifest::default();
            manifest.spec.installation.port = Some(443);
            manifest.spec.installation.uuid = Some(name.to_string());
            manifest.fill_generated_defaults();

            let err = manifest.validate().unwrap_err().to_string();
            assert!(err.contains("spec.installation.uuid"), "{name}: {err}");
            assert!(manifest.resolve_installation().is_err(), "{name} resolved");
        }
    }
}
