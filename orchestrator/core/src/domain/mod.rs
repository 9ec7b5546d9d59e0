// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: value objects, port traits, and the supervisor domain service.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure installation model plus the traits infrastructure implements

pub mod artifact;
pub mod certificate;
pub mod error;
pub mod installation;
pub mod launch;
pub mod service_config;
pub mod subscription;
pub mod supervisor;
pub mod template;
pub mod work_dir;
