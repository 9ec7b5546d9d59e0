// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # hyvisor CLI
//!
//! The `hyvisor` binary installs a Hysteria 2 server into a work directory,
//! keeps it running and removes the installed artifacts once it is up.
//!
//! ## Commands
//!
//! - `hyvisor run` - Install, supervise and reap
//! - `hyvisor install` - Install only
//! - `hyvisor subscription show [--decode]` - Print the subscription record
//! - `hyvisor config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use hyvisor_cli::commands::{self, ConfigCommand, SubscriptionCommand};

/// hyvisor - Hysteria 2 installer and supervisor
#[derive(Parser)]
#[command(name = "hyvisor")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HYVISOR_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9464)
    #[arg(long, global = true, env = "HYVISOR_METRICS_LISTEN", value_name = "ADDR")]
    metrics_listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, then supervise the service and clean up its artifacts
    #[command(name = "run")]
    Run,

    /// Install the service without starting it
    #[command(name = "install")]
    Install,

    /// Subscription record operations
    #[command(name = "subscription")]
    Subscription {
        #[command(subcommand)]
        command: SubscriptionCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    if let Some(addr) = cli.metrics_listen {
        init_metrics(addr)?;
    }

    match cli.command {
        Some(Commands::Run) => commands::run::execute(cli.config).await,
        Some(Commands::Install) => commands::install::execute(cli.config).await,
        Some(Commands::Subscription { command }) => {
            commands::subscription::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

/// Install the Prometheus exporter as the global metrics recorder
fn init_metrics(addr: SocketAddr) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to start Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}
