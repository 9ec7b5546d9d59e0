// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Config Template Rendering
//!
//! The service configuration ships as a template with five literal
//! placeholders. [`render`] substitutes exactly those tokens in one
//! left-to-right pass and copies every other byte through untouched. Values
//! inserted for one placeholder are never scanned again, so a secret that
//! happens to contain `YOUR_DOMAIN` is emitted verbatim.
//!
//! A placeholder missing from the template is not an error: template
//! revisions differ in which tokens they use, and an absent token simply
//! means that substitution does nothing. [`RenderOutcome::substitutions`]
//! reports how many times each token fired so callers can log it.

use async_trait::async_trait;

use crate::domain::certificate::CertificateBundle;
use crate::domain::error::TemplateError;
use crate::domain::installation::{InstallationConfig, ServiceProfile};

pub const PASSWORD_TOKEN: &str = "YOUR_PASSWORD";
pub const DOMAIN_TOKEN: &str = "YOUR_DOMAIN";
pub const CERT_PATH_TOKEN: &str = "YOUR_CERT_PATH";
pub const KEY_PATH_TOKEN: &str = "YOUR_KEY_PATH";

/// Masquerade endpoint of the packaged template; must survive rendering.
pub const DEFAULT_MASQUERADE_LITERAL: &str = "https://www.bing.com";

/// Which placeholder a substitution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Port,
    Password,
    Domain,
    CertPath,
    KeyPath,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::Port,
        Placeholder::Password,
        Placeholder::Domain,
        Placeholder::CertPath,
        Placeholder::KeyPath,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Placeholder::Port => "port",
            Placeholder::Password => "password",
            Placeholder::Domain => "domain",
            Placeholder::CertPath => "cert_path",
            Placeholder::KeyPath => "key_path",
        }
    }
}

/// Result of a render: the document plus per-token hit counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub rendered: String,
    pub substitutions: Vec<(Placeholder, usize)>,
}

impl RenderOutcome {
    pub fn count(&self, placeholder: Placeholder) -> usize {
        self.substitutions
            .iter()
            .find(|(p, _)| *p == placeholder)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Substitute the five placeholders of `profile` in `template`.
pub fn render(
    template: &str,
    profile: &ServiceProfile,
    cfg: &InstallationConfig,
    bundle: &CertificateBundle,
) -> RenderOutcome {
    let port_value = format!(":{}", cfg.listen_port);
    let cert_path = bundle.cert_path.display().to_string();
    let key_path = bundle.key_path.display().to_string();

    let table: [(Placeholder, &str, &str); 5] = [
        (Placeholder::Port, profile.sentinel_port.as_str(), port_value.as_str()),
        (Placeholder::Password, PASSWORD_TOKEN, cfg.shared_secret.as_str()),
        (Placeholder::Domain, DOMAIN_TOKEN, cfg.domain.as_str()),
        (Placeholder::CertPath, CERT_PATH_TOKEN, cert_path.as_str()),
        (Placeholder::KeyPath, KEY_PATH_TOKEN, key_path.as_str()),
    ];

    let mut counts = [0usize; 5];
    let mut rendered = String::with_capacity(template.len() + 128);
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (idx, (_, token, value)) in table.iter().enumerate() {
            if !token.is_empty() && rest.starts_with(token) {
                rendered.push_str(value);
                counts[idx] += 1;
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        // Advance by one whole character to stay on a UTF-8 boundary.
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            rendered.push(c);
        }
        rest = chars.as_str();
    }

    RenderOutcome {
        rendered,
        substitutions: table
            .iter()
            .zip(counts)
            .map(|((p, _, _), n)| (*p, n))
            .collect(),
    }
}

/// Confirm `literal` occurs in `rendered` at least as often as in `template`.
pub fn ensure_literal_preserved(
    template: &str,
    rendered: &str,
    literal: &str,
) -> Result<(), TemplateError> {
    if literal.is_empty() {
        return Ok(());
    }
    let before = template.matches(literal).count();
    let after = rendered.matches(literal).count();
    if after < before {
        return Err(TemplateError::RenderError(format!(
            "protected literal '{literal}' appears {before} time(s) in the template but {after} time(s) after rendering"
        )));
    }
    Ok(())
}

/// If the template is JSON, the rendered document must be JSON as well.
pub fn ensure_structure_preserved(template: &str, rendered: &str) -> Result<(), TemplateError> {
    if serde_json::from_str::<serde_json::Value>(template).is_err() {
        return Ok(());
    }
    serde_json::from_str::<serde_json::Value>(rendered)
        .map(|_| ())
        .map_err(|e| {
            TemplateError::RenderError(format!(
                "template is valid JSON but the rendered config is not: {e}"
            ))
        })
}

/// Where template bytes come from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Human-readable origin for logs and errors.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<String, TemplateError>;
}
