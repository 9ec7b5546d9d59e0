// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Config Template Sources
//!
//! | Source | Origin |
//! |--------|--------|
//! | [`EmbeddedTemplateSource`] | compiled into the binary |
//! | [`FileTemplateSource`] | a file on local disk |
//! | [`RemoteTemplateSource`] | an HTTP(S) URL via `ArtifactFetcher` |

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::artifact::ArtifactFetcher;
use crate::domain::error::TemplateError;
use crate::domain::template::TemplateSource;

/// Packaged Hysteria 2 server config template.
pub const HYSTERIA2_TEMPLATE: &str = include_str!("../../templates/hysteria2-config.json");

#[derive(Debug, Clone)]
pub struct EmbeddedTemplateSource {
    name: &'static str,
    contents: &'static str,
}

impl EmbeddedTemplateSource {
    pub fn hysteria2() -> Self {
        Self {
            name: "hysteria2-config.json",
            contents: HYSTERIA2_TEMPLATE,
        }
    }

    pub fn new(name: &'static str, contents: &'static str) -> Self {
        Self { name, contents }
    }
}

#[async_trait]
impl TemplateSource for EmbeddedTemplateSource {
    fn describe(&self) -> String {
        format!("embedded:{}", self.name)
    }

    async fn load(&self) -> Result<String, TemplateError> {
        if self.contents.is_empty() {
            return Err(TemplateError::TemplateMissing {
                origin: self.describe(),
                reason: "packaged template is empty".to_string(),
            });
        }
        Ok(self.contents.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct FileTemplateSource {
    path: PathBuf,
}

impl FileTemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load(&self) -> Result<String, TemplateError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TemplateError::TemplateMissing {
                origin: self.describe(),
                reason: e.to_string(),
            })
    }
}

pub struct RemoteTemplateSource {
    url: String,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl RemoteTemplateSource {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait]
impl TemplateSource for RemoteTemplateSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn load(&self) -> Result<String, TemplateError> {
        let body = self
            .fetcher
            .fetch(&self.url)
            .await
            .map_err(|e| TemplateError::TemplateMissing {
                origin: self.describe(),
                reason: e.to_string(),
            })?;
        String::from_utf8(body.to_vec()).map_err(|e| TemplateError::TemplateMissing {
            origin: self.describe(),
            reason: format!("template is not UTF-8: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FetchError;
    use crate::domain::template::{CERT_PATH_TOKEN, DEFAULT_MASQUERADE_LITERAL, KEY_PATH_TOKEN, PASSWORD_TOKEN};
    use bytes::Bytes;

    struct StaticFetcher(Result<&'static [u8], u16>);

    #[async_trait]
    impl ArtifactFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            match self.0 {
                Ok(body) => Ok(Bytes::from_static(body)),
                Err(status) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_embedded_template_has_all_tokens() {
        let template = EmbeddedTemplateSource::hysteria2().load().await.unwrap();
        for token in [":10008", PASSWORD_TOKEN, CERT_PATH_TOKEN, KEY_PATH_TOKEN, DEFAULT_MASQUERADE_LITERAL] {
            assert!(template.contains(token), "missing {token}");
        }
        assert!(serde_json::from_str::<serde_json::Value>(&template).is_ok());
    }

    #[tokio::test]
    async fn test_empty_embedded_template_is_missing() {
        let err = EmbeddedTemplateSource::new("empty.json", "").load().await.unwrap_err();
        assert!(matches!(err, TemplateError::TemplateMissing { .. }));
    }

    #[tokio::test]
    async fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, "{\"listen\": \":10008\"}").unwrap();

        let loaded = FileTemplateSource::new(&path).load().await.unwrap();
        assert!(loaded.contains(":10008"));

        let err = FileTemplateSource::new(dir.path().join("nope.json"))
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[tokio::test]
    async fn test_remote_source_maps_fetch_failure() {
        let ok = RemoteTemplateSource::new("https://example.invalid/t.json", Arc::new(StaticFetcher(Ok(b"{}"))));
        assert_eq!(ok.load().await.unwrap(), "{}");

        let missing = RemoteTemplateSource::new("https://example.invalid/t.json", Arc::new(StaticFetcher(Err(404))));
        let err = missing.load().await.unwrap_err();
        assert!(matches!(err, TemplateError::TemplateMissing { .. }));
        assert!(err.to_string().contains("404"));
    }
}
