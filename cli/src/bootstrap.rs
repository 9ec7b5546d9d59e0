// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring
//!
//! Turns a loaded `ServiceConfigManifest` into the concrete installer,
//! supervisor and reaper the commands run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use hyvisor_core::application::{ArtifactInstaller, LifecycleReaper};
use hyvisor_core::domain::artifact::{ArtifactFetcher, ArtifactStore};
use hyvisor_core::domain::installation::InstallationConfig;
use hyvisor_core::domain::service_config::{ServiceConfigManifest, TemplateSourceKind};
use hyvisor_core::domain::supervisor::ProcessSupervisor;
use hyvisor_core::domain::template::TemplateSource;
use hyvisor_core::domain::work_dir::WorkDirectory;
use hyvisor_core::infrastructure::{
    EmbeddedTemplateSource, FileTemplateSource, HttpArtifactFetcher, LocalArtifactStore,
    RemoteTemplateSource, RsaCertificateBackend, ShellProcessLauncher,
};

/// Load, override and validate the manifest.
pub fn load_manifest(config_override: Option<PathBuf>) -> Result<ServiceConfigManifest> {
    let manifest = ServiceConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    manifest
        .validate()
        .context("Configuration validation failed")?;
    Ok(manifest)
}

/// Resolve the installation, generating identity values that are missing.
pub fn resolve_installation(manifest: &mut ServiceConfigManifest) -> Result<InstallationConfig> {
    let had_identity = manifest.spec.installation.uuid.is_some();
    manifest.fill_generated_defaults();
    let cfg = manifest
        .resolve_installation()
        .context("Invalid installation settings")?;
    if !had_identity {
        info!(identity = %cfg.identity_id, "Generated installation identity");
    }
    Ok(cfg)
}

pub fn work_dir(manifest: &ServiceConfigManifest) -> WorkDirectory {
    WorkDirectory::new(&manifest.spec.work_dir, &manifest.service_profile())
}

fn template_source(
    manifest: &ServiceConfigManifest,
    fetcher: Arc<dyn ArtifactFetcher>,
) -> Arc<dyn TemplateSource> {
    let settings = &manifest.spec.template;
    let location = settings.location.clone().unwrap_or_default();
    match settings.source {
        TemplateSourceKind::Embedded => Arc::new(EmbeddedTemplateSource::hysteria2()),
        TemplateSourceKind::File => Arc::new(FileTemplateSource::new(location)),
        TemplateSourceKind::Url => Arc::new(RemoteTemplateSource::new(location, fetcher)),
    }
}

pub fn build_installer(manifest: &ServiceConfigManifest) -> Result<ArtifactInstaller> {
    let fetcher: Arc<dyn ArtifactFetcher> =
        Arc::new(HttpArtifactFetcher::new().context("Failed to create HTTP client")?);
    let store: Arc<dyn ArtifactStore> = Arc::new(LocalArtifactStore::new());
    let certificate = &manifest.spec.certificate;

    Ok(ArtifactInstaller::new(
        manifest.service_profile(),
        &manifest.spec.work_dir,
        Arc::clone(&fetcher),
        store,
        Arc::new(RsaCertificateBackend::new()),
        template_source(manifest, fetcher),
    )
    .with_certificate_subject(certificate.subject_cn.clone(), certificate.validity_days)
    .with_protected_literal(manifest.spec.template.protected_literal.clone()))
}

pub fn build_supervisor(manifest: &ServiceConfigManifest) -> Result<ProcessSupervisor> {
    let settings = &manifest.spec.supervisor;
    Ok(ProcessSupervisor::new(
        Arc::new(ShellProcessLauncher::new()),
        Arc::new(LocalArtifactStore::new()),
    )
    .with_backoff(settings.backoff)
    .with_output(settings.child_output()?))
}

pub fn build_reaper(manifest: &ServiceConfigManifest) -> LifecycleReaper {
    LifecycleReaper::new(Arc::new(LocalArtifactStore::new())).with_delay(manifest.spec.reaper.delay)
}
