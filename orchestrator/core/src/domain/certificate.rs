// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # TLS Identity Types
//!
//! The managed service terminates TLS with a self-signed certificate; clients
//! connect with `insecure=1`, so no external CA is involved and installation
//! works offline.
//!
//! [`CertificateBackend`] is the single crypto capability the provisioner
//! needs. Implementations live in `crate::infrastructure::certificate`.

use std::path::PathBuf;

use crate::domain::error::CertGenerationError;

pub const DEFAULT_SUBJECT_CN: &str = "localhost";
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// PEM output of one self-signing operation.
#[derive(Clone)]
pub struct SelfSignedPair {
    pub cert_pem: String,
    pub key_pem: String,
    /// Big-endian serial number bytes as written into the certificate.
    pub serial: Vec<u8>,
}

impl std::fmt::Debug for SelfSignedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedPair")
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

/// Certificate and key as persisted in the work directory.
#[derive(Clone)]
pub struct CertificateBundle {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub serial: Vec<u8>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("serial", &self.serial_hex())
            .finish_non_exhaustive()
    }
}

impl CertificateBundle {
    pub fn serial_hex(&self) -> String {
        self.serial.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Produces a self-signed certificate and its private key.
pub trait CertificateBackend: Send + Sync {
    fn self_sign(
        &self,
        subject_cn: &str,
        validity_days: u32,
    ) -> Result<SelfSignedPair, CertGenerationError>;
}
