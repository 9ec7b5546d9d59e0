// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! hyvisor core
//!
//! Installs a proxy service binary into a work directory, provisions its TLS
//! identity and config, supervises the running process and cleans up the
//! installed artifacts afterwards.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and infrastructure adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
