// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `hyvisor install`: run the installation pipeline only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::bootstrap;

pub async fn execute(config_override: Option<PathBuf>) -> Result<()> {
    let mut manifest = bootstrap::load_manifest(config_override)?;
    let cfg = bootstrap::resolve_installation(&mut manifest)?;

    let receipt = bootstrap::build_installer(&manifest)?
        .install(&cfg)
        .await
        .context("Installation failed")?;

    println!("{}", "✓ Installation complete".green());
    println!("  Work directory: {}", receipt.work_dir.root().display());
    println!("  Architecture:   {}", receipt.architecture);
    println!("  Downloaded:     {}", receipt.download_url);
    println!("  Certificate:    {} (serial {})", receipt.certificate.cert_path.display(), receipt.certificate.serial_hex());
    println!("  Launch script:  {}", receipt.work_dir.launch_script_path().display());
    println!("  Subscription:   {}", receipt.subscription_path.display());
    println!();
    println!("{}", receipt.subscription.encoded());

    Ok(())
}
