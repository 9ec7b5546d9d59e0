// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Config Templater Application Service
//!
//! Loads a template from a `TemplateSource`, renders it for one installation
//! and checks the result before anything is written.

use std::sync::Arc;

use tracing::debug;

use crate::domain::artifact::ArtifactStore;
use crate::domain::certificate::CertificateBundle;
use crate::domain::error::{InstallCause, TemplateError};
use crate::domain::installation::{InstallationConfig, ServiceProfile};
use crate::domain::template::{self, TemplateSource, DEFAULT_MASQUERADE_LITERAL};
use crate::domain::work_dir::WorkDirectory;

pub struct ConfigTemplater {
    profile: ServiceProfile,
    protected_literal: String,
}

impl ConfigTemplater {
    pub fn new(profile: ServiceProfile) -> Self {
        Self {
            profile,
            protected_literal: DEFAULT_MASQUERADE_LITERAL.to_string(),
        }
    }

    /// Literal that must appear in the output as often as in the template.
    pub fn with_protected_literal(mut self, literal: impl Into<String>) -> Self {
        self.protected_literal = literal.into();
        self
    }

    /// Render and verify a template already in memory.
    pub fn render(
        &self,
        template_text: &str,
        cfg: &InstallationConfig,
        bundle: &CertificateBundle,
    ) -> Result<String, TemplateError> {
        let outcome = template::render(template_text, &self.profile, cfg, bundle);

        // Counts only; the password value never reaches the log.
        for (placeholder, count) in &outcome.substitutions {
            debug!(placeholder = placeholder.label(), count, "Template substitution");
        }

        template::ensure_literal_preserved(template_text, &outcome.rendered, &self.protected_literal)?;
        template::ensure_structure_preserved(template_text, &outcome.rendered)?;
        Ok(outcome.rendered)
    }

    pub async fn load_and_render(
        &self,
        source: &dyn TemplateSource,
        cfg: &InstallationConfig,
        bundle: &CertificateBundle,
    ) -> Result<String, TemplateError> {
        let template_text = source.load().await?;
        debug!(origin = %source.describe(), bytes = template_text.len(), "Loaded config template");
        self.render(&template_text, cfg, bundle)
    }

    /// Render and write the config file into the work directory.
    pub async fn materialize(
        &self,
        source: &dyn TemplateSource,
        store: &Arc<dyn ArtifactStore>,
        work_dir: &WorkDirectory,
        cfg: &InstallationConfig,
        bundle: &CertificateBundle,
    ) -> Result<String, InstallCause> {
        let rendered = self.load_and_render(source, cfg, bundle).await?;
        store
            .write_file(&work_dir.config_path(), rendered.as_bytes())
            .await?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::LocalArtifactStore;
    use crate::infrastructure::template_source::{EmbeddedTemplateSource, FileTemplateSource};
    use std::path::PathBuf;

    fn cfg(secret: &str) -> InstallationConfig {
        InstallationConfig {
            domain: "example.com".to_string(),
            listen_port: 8443,
            identity_id: "abc-123".to_string(),
            shared_secret: secret.to_string(),
            service_version: "2.6.0".to_string(),
            remarks_prefix: "demo".to_string(),
        }
    }

    fn bundle() -> CertificateBundle {
        CertificateBundle {
            cert_pem: String::new(),
            key_pem: String::new(),
            cert_path: PathBuf::from("/w/hysteria.crt"),
            key_path: PathBuf::from("/w/hysteria.key"),
            serial: vec![1],
        }
    }

    #[tokio::test]
    async fn test_embedded_template_renders_to_valid_json() {
        let templater = ConfigTemplater::new(ServiceProfile::hysteria2());
        let rendered = templater
            .load_and_render(&EmbeddedTemplateSource::hysteria2(), &cfg("s3cret"), &bundle())
            .await
            .unwrap();

        let doc: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(doc["listen"], ":8443");
        assert_eq!(doc["auth"]["password"], "s3cret");
        assert_eq!(doc["tls"]["cert"], "/w/hysteria.crt");
        assert_eq!(doc["tls"]["key"], "/w/hysteria.key");
        assert_eq!(doc["masquerade"]["proxy"]["url"], "https://www.bing.com");
    }

    #[test]
    fn test_quote_in_secret_breaks_structure() {
        let templater = ConfigTemplater::new(ServiceProfile::hysteria2());
        let err = templater
            .render(r#"{"password": "YOUR_PASSWORD"}"#, &cfg("bad\"quote"), &bundle())
            .unwrap_err();
        assert!(matches!(err, TemplateError::RenderError(_)));
    }

    #[test]
    fn test_plain_text_template_renders() {
        let templater = ConfigTemplater::new(ServiceProfile::hysteria2()).with_protected_literal("keep-me");
        let rendered = templater
            .render("listen :10008\nkeep-me\n", &cfg("s3cret"), &bundle())
            .unwrap();
        assert_eq!(rendered, "listen :8443\nkeep-me\n");
    }

    #[tokio::test]
    async fn test_missing_file_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let templater = ConfigTemplater::new(ServiceProfile::hysteria2());
        let err = templater
            .load_and_render(&FileTemplateSource::new(dir.path().join("gone.json")), &cfg("x"), &bundle())
            .await
            .unwrap_err();
        assert!(matches!(err, TemplateError::TemplateMissing { .. }));
    }

    #[tokio::test]
    async fn test_materialize_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDirectory::new(dir.path(), &ServiceProfile::hysteria2());
        let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new());

        let rendered = ConfigTemplater::new(ServiceProfile::hysteria2())
            .materialize(&EmbeddedTemplateSource::hysteria2(), &store, &wd, &cfg("s3cret"), &bundle())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(wd.config_path()).unwrap(), rendered);
    }
}
