//! Product certificate encoding, signing and verification.
//!
//! # Wire Format
//! ```text
//! PEM "<PRODUCT> CERTIFICATE"
//!     → protobuf RawCertificate { 1: details, 2: signature }
//!     → details { name, ip/mask pairs, subnet pairs, groups,
//!                 not_before, not_after, public_key, is_ca, issuer, curve }
//! ```
//!
//! The signature covers the protobuf encoding of `details`. CURVE25519
//! certificates are signed with Ed25519, P256 certificates with ECDSA
//! (SHA-256, DER encoded).

use p256::elliptic_curve::sec1::ToEncodedPoint;
use prost::Message;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::Ipv4Addr;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::pki::pem;
use crate::pki::types::{PkiError, PkiResult, Product};

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawCertificate {
    #[prost(message, optional, tag = "1")]
    pub details: ::core::option::Option<RawCertificateDetails>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RawCertificateDetails {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint32, repeated, tag = "2")]
    pub ips: Vec<u32>,
    #[prost(uint32, repeated, tag = "3")]
    pub subnets: Vec<u32>,
    #[prost(string, repeated, tag = "4")]
    pub groups: Vec<String>,
    #[prost(int64, tag = "5")]
    pub not_before: i64,
    #[prost(int64, tag = "6")]
    pub not_after: i64,
    #[prost(bytes = "vec", tag = "7")]
    pub public_key: Vec<u8>,
    #[prost(bool, tag = "8")]
    pub is_ca: bool,
    #[prost(bytes = "vec", tag = "9")]
    pub issuer: Vec<u8>,
    #[prost(enumeration = "CertCurve", tag = "100")]
    pub curve: i32,
}

/// Curve a certificate's key and signature belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CertCurve {
    Curve25519 = 0,
    P256 = 1,
}

impl CertCurve {
    pub fn name(self) -> &'static str {
        match self {
            CertCurve::Curve25519 => "CURVE25519",
            CertCurve::P256 => "P256",
        }
    }
}

/// An address/mask pair carried in a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertNet {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl CertNet {
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).leading_ones()
    }
}

impl fmt::Display for CertNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len())
    }
}

impl Serialize for CertNet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The signed portion of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    pub name: String,
    pub ips: Vec<CertNet>,
    pub subnets: Vec<CertNet>,
    pub groups: Vec<String>,
    /// Start of the validity window, unix seconds.
    pub not_before: i64,
    /// End of the validity window, unix seconds.
    pub not_after: i64,
    pub public_key: Vec<u8>,
    pub is_ca: bool,
    /// Fingerprint bytes of the issuing CA (empty for self-signed).
    pub issuer: Vec<u8>,
    pub curve: CertCurve,
}

impl CertificateDetails {
    fn from_raw(raw: RawCertificateDetails) -> PkiResult<Self> {
        let curve = CertCurve::try_from(raw.curve).map_err(|_| {
            PkiError::MalformedCertificate(format!("unknown curve value {}", raw.curve))
        })?;

        Ok(Self {
            name: raw.name,
            ips: pairs(&raw.ips, "IPs")?,
            subnets: pairs(&raw.subnets, "subnets")?,
            groups: raw.groups,
            not_before: raw.not_before,
            not_after: raw.not_after,
            public_key: raw.public_key,
            is_ca: raw.is_ca,
            issuer: raw.issuer,
            curve,
        })
    }

    fn to_raw(&self) -> RawCertificateDetails {
        RawCertificateDetails {
            name: self.name.clone(),
            ips: flatten(&self.ips),
            subnets: flatten(&self.subnets),
            groups: self.groups.clone(),
            not_before: self.not_before,
            not_after: self.not_after,
            public_key: self.public_key.clone(),
            is_ca: self.is_ca,
            issuer: self.issuer.clone(),
            curve: self.curve as i32,
        }
    }

    /// Bytes covered by the certificate signature.
    pub fn encode(&self) -> Vec<u8> {
        self.to_raw().encode_to_vec()
    }
}

fn pairs(values: &[u32], what: &str) -> PkiResult<Vec<CertNet>> {
    if values.len() % 2 != 0 {
        return Err(PkiError::MalformedCertificate(format!(
            "encoded {what} should be in pairs, an odd number was found"
        )));
    }
    Ok(values
        .chunks_exact(2)
        .map(|pair| CertNet {
            ip: Ipv4Addr::from(pair[0]),
            mask: Ipv4Addr::from(pair[1]),
        })
        .collect())
}

fn flatten(nets: &[CertNet]) -> Vec<u32> {
    nets.iter()
        .flat_map(|n| [u32::from(n.ip), u32::from(n.mask)])
        .collect()
}

/// Private key used to sign certificates.
pub enum SigningMaterial {
    Ed25519(ed25519_dalek::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

impl SigningMaterial {
    fn curve(&self) -> CertCurve {
        match self {
            SigningMaterial::Ed25519(_) => CertCurve::Curve25519,
            SigningMaterial::P256(_) => CertCurve::P256,
        }
    }

    /// Public key in the form certificates carry it.
    pub fn public_key(&self) -> Vec<u8> {
        match self {
            SigningMaterial::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            SigningMaterial::P256(key) => key
                .verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec(),
        }
    }
}

/// A decoded product certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub product: Product,
    pub details: CertificateDetails,
    pub signature: Vec<u8>,
}

impl Certificate {
    /// Decodes the first certificate PEM block in `input`.
    ///
    /// Returns the certificate and the unconsumed remainder of `input`.
    pub fn from_pem(input: &str) -> PkiResult<(Self, &str)> {
        let (block, rest) =
            pem::decode(input).map_err(|e| PkiError::MalformedCertificate(e.to_string()))?;

        let product = Product::from_certificate_label(&block.label).ok_or_else(|| {
            PkiError::MalformedCertificate(format!(
                "bytes did not contain a proper certificate banner, found {:?}",
                block.label
            ))
        })?;

        Ok((Self::from_bytes(product, &block.contents)?, rest))
    }

    /// Decodes the binary (protobuf) form of a certificate.
    pub fn from_bytes(product: Product, bytes: &[u8]) -> PkiResult<Self> {
        let raw = RawCertificate::decode(bytes)
            .map_err(|e| PkiError::MalformedCertificate(e.to_string()))?;
        let details = raw.details.ok_or_else(|| {
            PkiError::MalformedCertificate("encoded details was missing".to_string())
        })?;

        Ok(Self {
            product,
            details: CertificateDetails::from_raw(details)?,
            signature: raw.signature,
        })
    }

    /// Binary (protobuf) form of the certificate.
    pub fn to_bytes(&self) -> Vec<u8> {
        RawCertificate {
            details: Some(self.details.to_raw()),
            signature: self.signature.clone(),
        }
        .encode_to_vec()
    }

    /// Canonical PEM form of the certificate.
    pub fn to_pem(&self) -> String {
        pem::encode(&self.product.certificate_label(), &self.to_bytes())
    }

    /// Hex SHA-256 of the binary form.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.to_bytes()))
    }

    /// True when `now` is outside the validity window.
    pub fn expired(&self, now: OffsetDateTime) -> bool {
        let now = now.unix_timestamp();
        self.details.not_before > now || self.details.not_after < now
    }

    /// Verifies the signature over `details` against `public_key`.
    pub fn check_signature(&self, public_key: &[u8]) -> bool {
        let message = self.details.encode();
        match self.details.curve {
            CertCurve::Curve25519 => verify_ed25519(public_key, &message, &self.signature),
            CertCurve::P256 => verify_p256(public_key, &message, &self.signature),
        }
    }

    /// Signs `details` with `key`, producing a certificate.
    pub fn sign(
        product: Product,
        details: CertificateDetails,
        key: &SigningMaterial,
    ) -> PkiResult<Self> {
        if key.curve() != details.curve {
            return Err(PkiError::InvalidKey(format!(
                "signing key is {} but the certificate curve is {}",
                key.curve().name(),
                details.curve.name()
            )));
        }

        let message = details.encode();
        let signature = match key {
            SigningMaterial::Ed25519(key) => {
                let sig: ed25519_dalek::Signature = ed25519_dalek::Signer::sign(key, &message);
                sig.to_bytes().to_vec()
            }
            SigningMaterial::P256(key) => {
                let sig: p256::ecdsa::Signature =
                    p256::ecdsa::signature::Signer::sign(key, &message);
                sig.to_der().as_bytes().to_vec()
            }
        };

        Ok(Self {
            product,
            details,
            signature,
        })
    }

    /// Checks that `private_key` is the private half of this certificate's key.
    ///
    /// CA certificates on CURVE25519 hold Ed25519 keys (32-byte seed, or
    /// 64-byte seed||public); host certificates hold X25519 keys.
    pub fn verify_private_key(&self, private_key: &[u8]) -> PkiResult<()> {
        let derived = match (self.details.curve, self.details.is_ca) {
            (CertCurve::Curve25519, true) => {
                if private_key.len() != 32 && private_key.len() != 64 {
                    return Err(PkiError::InvalidKey(
                        "key was not 32 or 64 bytes, is invalid ed25519 private key".into(),
                    ));
                }
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&private_key[..32]);
                ed25519_dalek::SigningKey::from_bytes(&seed)
                    .verifying_key()
                    .to_bytes()
                    .to_vec()
            }
            (CertCurve::Curve25519, false) => {
                let scalar: [u8; 32] = private_key.try_into().map_err(|_| {
                    PkiError::InvalidKey("key was not 32 bytes, is invalid X25519 private key".into())
                })?;
                x25519_dalek::x25519(scalar, x25519_dalek::X25519_BASEPOINT_BYTES).to_vec()
            }
            (CertCurve::P256, _) => {
                let secret = p256::SecretKey::from_slice(private_key).map_err(|_| {
                    PkiError::InvalidKey("key is not a valid P256 private scalar".into())
                })?;
                secret.public_key().to_encoded_point(false).as_bytes().to_vec()
            }
        };

        if derived != self.details.public_key {
            return Err(PkiError::KeyMismatch(
                "public key in cert and private key supplied don't match".into(),
            ));
        }
        Ok(())
    }
}

fn verify_ed25519(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
        return false;
    };
    ed25519_dalek::Verifier::verify(&key, message, &sig).is_ok()
}

fn verify_p256(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
        return false;
    };
    p256::ecdsa::signature::Verifier::verify(&key, message, &sig).is_ok()
}

fn format_timestamp(secs: i64) -> String {
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| secs.to_string())
}

#[derive(Serialize)]
struct DetailsView<'a> {
    name: &'a str,
    ips: &'a [CertNet],
    subnets: &'a [CertNet],
    groups: &'a [String],
    not_before: String,
    not_after: String,
    public_key: String,
    is_ca: bool,
    issuer: String,
    curve: &'static str,
}

#[derive(Serialize)]
struct CertificateView<'a> {
    details: DetailsView<'a>,
    fingerprint: String,
    signature: String,
}

impl Serialize for Certificate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let d = &self.details;
        CertificateView {
            details: DetailsView {
                name: &d.name,
                ips: &d.ips,
                subnets: &d.subnets,
                groups: &d.groups,
                not_before: format_timestamp(d.not_before),
                not_after: format_timestamp(d.not_after),
                public_key: hex::encode(&d.public_key),
                is_ca: d.is_ca,
                issuer: hex::encode(&d.issuer),
                curve: d.curve.name(),
            },
            fingerprint: self.fingerprint(),
            signature: hex::encode(&self.signature),
        }
        .serialize(serializer)
    }
}
