// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! hyvisor CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers and service wiring for the `hyvisor` binary

pub mod bootstrap;
pub mod commands;
pub mod shutdown;
