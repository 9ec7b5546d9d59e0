// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for hyvisor CLI

pub mod config;
pub mod install;
pub mod run;
pub mod subscription;

pub use self::config::ConfigCommand;
pub use self::subscription::SubscriptionCommand;
