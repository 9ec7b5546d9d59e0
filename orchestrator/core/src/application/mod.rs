// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod certificate_provisioner;
pub mod config_templater;
pub mod installer;
pub mod reaper;

// Re-export services for convenience
pub use certificate_provisioner::CertificateProvisioner;
pub use config_templater::ConfigTemplater;
pub use installer::{ArtifactInstaller, InstallationReceipt};
pub use reaper::{LifecycleReaper, ReapReport, DEFAULT_REAP_DELAY};
