//! Certificate and key material.
//!
//! # Data Flow
//! ```text
//! concatenated PEM text
//!     → pem.rs (framing over the `pem` crate)
//!     → cert.rs (protobuf decode, signature check, canonical PEM)
//!     → chain.rs (expiry then CA self-signature → CertificateRecord)
//!
//! curve selector
//!     → keys.rs (OS randomness → PEM KeyPair)
//! ```
//!
//! # Design Decisions
//! - Parsing is all-or-nothing: one bad block fails the whole buffer
//! - Verdicts are data on the record, not errors
//! - Private keys are never cached; the generator hands them straight back

pub mod cert;
pub mod chain;
pub mod keys;
pub mod pem;
pub mod types;

pub use cert::{CertCurve, CertNet, Certificate, CertificateDetails, SigningMaterial};
pub use chain::{
    certificates_to_json, parse_certificates, parse_certificates_at, CertificateRecord, Rejection,
    Validity,
};
pub use keys::{generate_key_pair, generate_key_pair_named, verify_cert_and_key, KeyPair};
pub use types::{Curve, PkiError, PkiResult, Product};
