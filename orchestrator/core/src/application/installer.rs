// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Artifact Installer Application Service
//!
//! Runs the installation pipeline for one work directory:
//!
//! 1. prepare the work directory (clear artifacts of a previous install)
//! 2. resolve the release URL for the host architecture
//! 3. fetch and write the binary, then mark it executable
//! 4. provision the self-signed certificate
//! 5. render and write the service config
//! 6. write the launch script, then mark it executable
//! 7. publish the subscription record
//!
//! The first failing step aborts the run with an `InstallationFailedError`
//! naming that step. There is no retry here; the caller decides.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::application::certificate_provisioner::CertificateProvisioner;
use crate::application::config_templater::ConfigTemplater;
use crate::domain::artifact::{ArtifactFetcher, ArtifactStore, EXECUTABLE_MODE};
use crate::domain::certificate::{CertificateBackend, CertificateBundle};
use crate::domain::error::{InstallCause, InstallStep, InstallationFailedError, StoreError};
use crate::domain::installation::{Architecture, InstallationConfig, ServiceProfile};
use crate::domain::launch::render_launch_script;
use crate::domain::subscription::SubscriptionRecord;
use crate::domain::template::TemplateSource;
use crate::domain::work_dir::WorkDirectory;

// ============================================================================
// Receipt
// ============================================================================

/// What a successful installation produced.
#[derive(Debug, Clone)]
pub struct InstallationReceipt {
    pub work_dir: WorkDirectory,
    pub architecture: Architecture,
    pub download_url: String,
    pub certificate: CertificateBundle,
    pub subscription: SubscriptionRecord,
    pub subscription_path: PathBuf,
}

// ============================================================================
// Installer
// ============================================================================

/// Attach the failing step to any installation cause.
fn at<E: Into<InstallCause>>(step: InstallStep) -> impl FnOnce(E) -> InstallationFailedError {
    move |e| InstallationFailedError::new(step, e)
}

pub struct ArtifactInstaller {
    profile: ServiceProfile,
    work_dir: WorkDirectory,
    architecture: Architecture,
    fetcher: Arc<dyn ArtifactFetcher>,
    store: Arc<dyn ArtifactStore>,
    template_source: Arc<dyn TemplateSource>,
    provisioner: CertificateProvisioner,
    templater: ConfigTemplater,
}

impl ArtifactInstaller {
    pub fn new(
        profile: ServiceProfile,
        work_dir_root: impl Into<PathBuf>,
        fetcher: Arc<dyn ArtifactFetcher>,
        store: Arc<dyn ArtifactStore>,
        cert_backend: Arc<dyn CertificateBackend>,
        template_source: Arc<dyn TemplateSource>,
    ) -> Self {
        let work_dir = WorkDirectory::new(work_dir_root, &profile);
        Self {
            provisioner: CertificateProvisioner::new(cert_backend, Arc::clone(&store)),
            templater: ConfigTemplater::new(profile.clone()),
            architecture: Architecture::detect(),
            profile,
            work_dir,
            fetcher,
            store,
            template_source,
        }
    }

    /// Override host detection (cross-installs, tests).
    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_certificate_subject(mut self, subject_cn: impl Into<String>, validity_days: u32) -> Self {
        self.provisioner = self.provisioner.with_subject(subject_cn, validity_days);
        self
    }

    pub fn with_protected_literal(mut self, literal: impl Into<String>) -> Self {
        self.templater = self.templater.with_protected_literal(literal);
        self
    }

    pub fn work_dir(&self) -> &WorkDirectory {
        &self.work_dir
    }

    pub async fn install(&self, cfg: &InstallationConfig) -> Result<InstallationReceipt, InstallationFailedError> {
        info!(
            work_dir = %self.work_dir.root().display(),
            version = %cfg.service_version,
            arch = %self.architecture,
            "Starting installation"
        );

        match self.run_steps(cfg).await {
            Ok(receipt) => {
                metrics::counter!("hyvisor_installations_total", "outcome" => "success").increment(1);
                info!(
                    subscription = %receipt.subscription_path.display(),
                    "Installation complete"
                );
                Ok(receipt)
            }
            Err(e) => {
                metrics::counter!("hyvisor_installations_total", "outcome" => "failure").increment(1);
                error!(step = %e.step, error = %e.source, "Installation failed");
                Err(e)
            }
        }
    }

    async fn run_steps(&self, cfg: &InstallationConfig) -> Result<InstallationReceipt, InstallationFailedError> {
        use InstallStep::*;

        cfg.validate(&self.profile)
            .map_err(|reason| InstallationFailedError::new(PrepareWorkDir, InstallCause::Invalid(reason)))?;
        self.prepare_work_dir(cfg).await.map_err(at(PrepareWorkDir))?;

        let download_url = self
            .profile
            .download_url(&cfg.service_version, self.architecture)
            .map_err(|reason| InstallationFailedError::new(ResolveDownloadUrl, InstallCause::Invalid(reason)))?;
        debug!(url = %download_url, "Resolved download URL");

        let binary = self
            .fetcher
            .fetch(&download_url)
            .await
            .map_err(at(FetchBinary))?;
        let binary_path = self.work_dir.binary_path();
        self.store
            .write_file(&binary_path, &binary)
            .await
            .map_err(at(WriteBinary))?;
        self.store
            .set_mode(&binary_path, EXECUTABLE_MODE)
            .await
            .map_err(at(MarkBinaryExecutable))?;
        debug!(path = %binary_path.display(), bytes = binary.len(), "Binary installed");

        let certificate = self
            .provisioner
            .generate(&self.work_dir)
            .await
            .map_err(at(ProvisionCertificate))?;

        self.templater
            .materialize(
                self.template_source.as_ref(),
                &self.store,
                &self.work_dir,
                cfg,
                &certificate,
            )
            .await
            .map_err(at(RenderConfig))?;

        let script_path = self.work_dir.launch_script_path();
        let script = render_launch_script(&self.work_dir, &self.profile);
        self.store
            .write_file(&script_path, script.as_bytes())
            .await
            .map_err(at(WriteLaunchScript))?;
        self.store
            .set_mode(&script_path, EXECUTABLE_MODE)
            .await
            .map_err(at(MarkScriptExecutable))?;

        let subscription = SubscriptionRecord::build(cfg, &self.profile);
        let subscription_path = self.work_dir.subscription_path(&cfg.identity_id);
        self.store
            .write_file(&subscription_path, subscription.file_contents().as_bytes())
            .await
            .map_err(at(PublishSubscription))?;

        Ok(InstallationReceipt {
            work_dir: self.work_dir.clone(),
            architecture: self.architecture,
            download_url,
            certificate,
            subscription,
            subscription_path,
        })
    }

    async fn prepare_work_dir(&self, cfg: &InstallationConfig) -> Result<(), StoreError> {
        self.store.create_dir_all(self.work_dir.root()).await?;

        let mut previous: Vec<PathBuf> = self.work_dir.reapable_artifacts().into_iter().collect();
        previous.push(self.work_dir.subscription_path(&cfg.identity_id));
        previous.extend(self.work_dir.certificate_artifacts());

        for path in previous {
            if self.store.remove_file(&path).await? {
                debug!(path = %path.display(), "Removed artifact of previous installation");
            }
        }
        Ok(())
    }
}
