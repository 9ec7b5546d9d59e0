// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod certificate;
pub mod fetcher;
pub mod process;
pub mod store;
pub mod template_source;

pub use certificate::RsaCertificateBackend;
pub use fetcher::HttpArtifactFetcher;
pub use process::ShellProcessLauncher;
pub use store::LocalArtifactStore;
pub use template_source::{EmbeddedTemplateSource, FileTemplateSource, RemoteTemplateSource};
