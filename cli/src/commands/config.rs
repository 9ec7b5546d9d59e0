// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use hyvisor_core::domain::service_config::ServiceConfigManifest;

/// Annotated sample written by `config generate`.
pub const SAMPLE_CONFIG: &str = include_str!("../../templates/hyvisor-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./hyvisor.yaml)
        #[arg(short, long, default_value = "./hyvisor.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ServiceConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. HYVISOR_CONFIG_PATH: {}",
            std::env::var("HYVISOR_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./hyvisor.yaml");
        println!("  4. ~/.hyvisor/config.yaml");
        println!("  5. /etc/hyvisor/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    let install = &config.spec.installation;
    println!("{}", "Installation:".bold());
    println!("  Domain: {}", install.domain.as_deref().unwrap_or("(default)"));
    match install.port {
        Some(port) => println!("  Port: {}", port),
        None => println!("  Port: {}", "(not set, required)".yellow()),
    }
    println!("  Identity: {}", install.uuid.as_deref().unwrap_or("(generated at start)"));
    println!(
        "  Password: {}",
        if install.password.is_some() { "***" } else { "(generated at start)" }
    );
    println!("  Version: {}", install.version.as_deref().unwrap_or("(default)"));
    println!();

    println!("{}", "Runtime:".bold());
    println!("  Work directory: {}", config.spec.work_dir.display());
    println!("  Download URL: {}", config.spec.download.url_template);
    println!("  Template source: {:?}", config.spec.template.source);
    if let Some(location) = &config.spec.template.location {
        println!("    Location: {}", location);
    }
    println!("  Restart backoff: {:?}", config.spec.supervisor.backoff);
    println!("  Child output: {:?}", config.spec.supervisor.output);
    if config.spec.reaper.enabled {
        println!("  Reaper: after {:?}", config.spec.reaper.delay);
    } else {
        println!("  Reaper: {}", "disabled".dimmed());
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ServiceConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    if config.spec.installation.port.is_none() {
        println!(
            "{}",
            "! spec.installation.port is not set; `hyvisor run` will refuse to start".yellow()
        );
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    std::fs::write(&output, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_is_valid() {
        let manifest = ServiceConfigManifest::from_yaml_str(SAMPLE_CONFIG).unwrap();
        manifest.validate().unwrap();
        assert_eq!(manifest.spec.installation.port, Some(8443));
    }

    #[tokio::test]
    async fn test_generate_writes_sample() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("hyvisor.yaml");
        generate(output.clone()).await.unwrap();
        assert_eq!(std::fs::read_to_string(output).unwrap(), SAMPLE_CONFIG);
    }
}
