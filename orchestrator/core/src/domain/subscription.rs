// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Subscription record published after a successful install.
//!
//! The record is a connection URI, base64-encoded on a single line. The shared
//! secret is inserted without escaping; `InstallationConfig::validate` keeps
//! URI delimiters out of it.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::domain::installation::{InstallationConfig, ServiceProfile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    uri: String,
}

impl SubscriptionRecord {
    pub fn build(cfg: &InstallationConfig, profile: &ServiceProfile) -> Self {
        let uri = format!(
            "{scheme}://{secret}@{domain}:{port}/?insecure=1&sni={domain}#{prefix}-{tag}",
            scheme = profile.subscription_scheme,
            secret = cfg.shared_secret,
            domain = cfg.domain,
            port = cfg.listen_port,
            prefix = cfg.remarks_prefix,
            tag = profile.service_tag,
        );
        Self { uri }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Standard-alphabet base64 of the URI, no line wrapping.
    pub fn encoded(&self) -> String {
        STANDARD.encode(self.uri.as_bytes())
    }

    /// File payload: the encoded URI as the only line.
    pub fn file_contents(&self) -> String {
        format!("{}\n", self.encoded())
    }

    /// Decode a subscription file back into its URI.
    pub fn decode(contents: &str) -> Result<String, String> {
        let line = contents.trim();
        let bytes = STANDARD
            .decode(line)
            .map_err(|e| format!("subscription payload is not base64: {e}"))?;
        String::from_utf8(bytes).map_err(|e| format!("subscription payload is not UTF-8: {e}"))
    }
}
