// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hyvisor run`: install, then supervise the service and reap its artifacts.
//!
//! The supervisor and the reaper run as independent tasks that share only
//! the work directory. SIGINT/SIGTERM cancel the supervisor (which kills the
//! child) and abort a pending reap.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hyvisor_core::domain::supervisor::StopReason;

use crate::bootstrap;
use crate::shutdown::shutdown_signal;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let mut manifest = bootstrap::load_manifest(config_override)?;
    let cfg = bootstrap::resolve_installation(&mut manifest)?;

    let installer = bootstrap::build_installer(&manifest)?;
    let receipt = installer
        .install(&cfg)
        .await
        .context("Installation failed; service will not be started")?;

    println!(
        "{} {}",
        "✓ Installed into".green(),
        receipt.work_dir.root().display()
    );
    println!("  Subscription: {}", receipt.subscription_path.display());

    let work_dir = receipt.work_dir.clone();
    let supervisor = bootstrap::build_supervisor(&manifest)?;
    let cancel = CancellationToken::new();

    let mut supervisor_task = {
        let work_dir = work_dir.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { supervisor.supervise(&work_dir, cancel).await })
    };

    let reaper_task = if manifest.spec.reaper.enabled {
        let reaper = bootstrap::build_reaper(&manifest);
        let work_dir = work_dir.clone();
        Some(tokio::spawn(async move { reaper.reap(&work_dir).await }))
    } else {
        info!("Reaper disabled; installed artifacts stay on disk");
        None
    };

    let supervised = tokio::select! {
        joined = &mut supervisor_task => Some(joined),
        signal = shutdown_signal() => {
            signal?;
            None
        }
    };

    let report = match supervised {
        Some(joined) => joined.context("Supervisor task panicked")??,
        None => {
            info!("Shutting down");
            cancel.cancel();
            if let Some(reaper) = &reaper_task {
                reaper.abort();
            }
            supervisor_task.await.context("Supervisor task panicked")??
        }
    };

    // The service stopped on its own; let the reaper finish its one pass.
    if report.stop_reason != StopReason::Cancelled {
        if let Some(reaper) = reaper_task {
            tokio::select! {
                joined = reaper => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Reaper task failed");
                    }
                }
                signal = shutdown_signal() => {
                    signal?;
                    info!("Shutting down before reaper finished");
                }
            }
        }
    }

    println!(
        "{} after {} launch(es): {:?}",
        "Service stopped".bold(),
        report.launches,
        report.stop_reason
    );
    Ok(())
}
