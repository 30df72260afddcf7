//! PKI types and error definitions.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while handling certificates and key material.
#[derive(Debug, Error)]
pub enum PkiError {
    /// A PEM block or the certificate inside it could not be decoded.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// The requested curve is not one of the supported families.
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// Key material has the wrong banner, size or encoding.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A private key does not belong to the certificate it was checked against.
    #[error("key does not match certificate: {0}")]
    KeyMismatch(String),

    /// JSON rendering of parsed material failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for PKI operations.
pub type PkiResult<T> = Result<T, PkiError>;

/// Product whose banner appears in PEM labels (`VLAN CERTIFICATE`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    #[default]
    Vlan,
    Hiper,
}

impl Product {
    pub const ALL: [Product; 2] = [Product::Vlan, Product::Hiper];

    /// Upper-case banner used in PEM labels.
    pub fn banner(self) -> &'static str {
        match self {
            Product::Vlan => "VLAN",
            Product::Hiper => "HIPER",
        }
    }

    /// Label of a certificate PEM block.
    pub fn certificate_label(self) -> String {
        format!("{} CERTIFICATE", self.banner())
    }

    /// Finds the product whose certificate label equals `label`.
    pub fn from_certificate_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| label == p.certificate_label())
    }
}

/// Curve families the key generator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Curve {
    X25519,
    P256,
    Sm2P256,
}

impl Curve {
    /// Token used inside key PEM labels.
    pub fn label(self) -> &'static str {
        match self {
            Curve::X25519 => "X25519",
            Curve::P256 => "P256",
            Curve::Sm2P256 => "SM2",
        }
    }

    pub(crate) fn from_label(token: &str) -> Option<Self> {
        [Curve::X25519, Curve::P256, Curve::Sm2P256]
            .into_iter()
            .find(|c| c.label() == token)
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Curve::X25519 => "x25519",
            Curve::P256 => "p256",
            Curve::Sm2P256 => "sm2p256",
        };
        f.write_str(name)
    }
}

impl FromStr for Curve {
    type Err = PkiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x25519" | "25519" | "curve25519" => Ok(Curve::X25519),
            "p256" | "p-256" => Ok(Curve::P256),
            "sm2" | "sm2p256" | "sm2-p256" => Ok(Curve::Sm2P256),
            _ => Err(PkiError::UnsupportedCurve(s.to_string())),
        }
    }
}
