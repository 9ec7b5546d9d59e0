// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Subscription commands
//!
//! Commands: show

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use hyvisor_core::domain::artifact::ArtifactStore;
use hyvisor_core::domain::subscription::SubscriptionRecord;
use hyvisor_core::infrastructure::LocalArtifactStore;

use crate::bootstrap;

#[derive(Subcommand)]
pub enum SubscriptionCommand {
    /// Print the published subscription record
    Show {
        /// Print the decoded connection URI instead of the base64 payload
        #[arg(long)]
        decode: bool,
    },
}

pub async fn handle_command(command: SubscriptionCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        SubscriptionCommand::Show { decode } => show(config_override, decode).await,
    }
}

async fn show(config_override: Option<PathBuf>, decode: bool) -> Result<()> {
    let manifest = bootstrap::load_manifest(config_override)?;
    let identity = manifest.spec.installation.uuid.clone().context(
        "spec.installation.uuid is not set; the subscription file name is only known for a fixed identity",
    )?;

    let path = bootstrap::work_dir(&manifest).subscription_path(&identity);
    println!("{}", render(&LocalArtifactStore::new(), &path, decode).await?);
    Ok(())
}

async fn render(store: &dyn ArtifactStore, path: &Path, decode: bool) -> Result<String> {
    let contents = store
        .read_to_string(path)
        .await
        .with_context(|| format!("Failed to read subscription file {:?}", path))?;

    if decode {
        SubscriptionRecord::decode(&contents).map_err(anyhow::Error::msg)
    } else {
        Ok(contents.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyvisor_core::domain::installation::{InstallationConfig, ServiceProfile};

    #[tokio::test]
    async fn test_render_reads_published_record() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = InstallationConfig {
            domain: "example.com".to_string(),
            listen_port: 8443,
            identity_id: "abc-123".to_string(),
            shared_secret: "s3cret".to_string(),
            service_version: "2.6.0".to_string(),
            remarks_prefix: "demo".to_string(),
        };
        let record = SubscriptionRecord::build(&cfg, &ServiceProfile::hysteria2());
        let path = dir.path().join("abc-123");
        std::fs::write(&path, record.file_contents()).unwrap();

        let store = LocalArtifactStore::new();
        assert_eq!(render(&store, &path, false).await.unwrap(), record.encoded());
        assert_eq!(render(&store, &path, true).await.unwrap(), record.uri());
    }

    #[tokio::test]
    async fn test_render_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent-id");
        let err = render(&LocalArtifactStore::new(), &path, false).await.unwrap_err();
        assert!(format!("{err:#}").contains("absent-id"));
    }
}
