//! Key pair generation and key PEM encoding.
//!
//! Keys travel as raw bytes inside PEM blocks labelled
//! `<PRODUCT> <CURVE> PUBLIC KEY` / `<PRODUCT> <CURVE> PRIVATE KEY`.
//! CA signing keys use the `ED25519` curve token.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::Serialize;
use std::fmt;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret as X25519Secret};
use zeroize::{Zeroize, Zeroizing};

use crate::pki::cert::Certificate;
use crate::pki::pem;
use crate::pki::types::{Curve, PkiError, PkiResult, Product};

const PUBLIC_SUFFIX: &str = "PUBLIC KEY";
const PRIVATE_SUFFIX: &str = "PRIVATE KEY";
const SIGNING_TOKEN: &str = "ED25519";

/// A freshly generated key pair in PEM form.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Generate a key pair on `curve`, labelled for `product`.
///
/// Every call draws a fresh secret from the OS random source.
pub fn generate_key_pair(curve: Curve, product: Product) -> KeyPair {
    let (public, private) = match curve {
        Curve::X25519 => {
            let secret = X25519Secret::random_from_rng(OsRng);
            let public = X25519Public::from(&secret);
            (
                public.as_bytes().to_vec(),
                Zeroizing::new(secret.to_bytes().to_vec()),
            )
        }
        Curve::P256 => {
            let secret = p256::SecretKey::random(&mut OsRng);
            (
                secret.public_key().to_encoded_point(false).as_bytes().to_vec(),
                Zeroizing::new(secret.to_bytes().to_vec()),
            )
        }
        Curve::Sm2P256 => {
            let secret = sm2::SecretKey::random(&mut OsRng);
            (
                sm2::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(
                    &secret.public_key(),
                    false,
                )
                .as_bytes()
                .to_vec(),
                Zeroizing::new(secret.to_bytes().to_vec()),
            )
        }
    };

    KeyPair {
        public_key: marshal_public_key(product, curve, &public),
        private_key: marshal_private_key(product, curve, &private),
    }
}

/// Generate a key pair from a curve name such as `x25519`, `p256` or `sm2`.
pub fn generate_key_pair_named(curve: &str, product: Product) -> PkiResult<KeyPair> {
    Ok(generate_key_pair(curve.parse()?, product))
}

pub fn marshal_public_key(product: Product, curve: Curve, key: &[u8]) -> String {
    pem::encode(&key_label(product, curve.label(), PUBLIC_SUFFIX), key)
}

pub fn marshal_private_key(product: Product, curve: Curve, key: &[u8]) -> String {
    pem::encode(&key_label(product, curve.label(), PRIVATE_SUFFIX), key)
}

/// PEM form of a CA signing seed.
pub fn marshal_signing_key(product: Product, seed: &[u8; 32]) -> String {
    pem::encode(&key_label(product, SIGNING_TOKEN, PRIVATE_SUFFIX), seed)
}

pub fn unmarshal_public_key(input: &str) -> PkiResult<(Curve, Vec<u8>)> {
    let (token, bytes) = decode_key(input, PUBLIC_SUFFIX)?;
    let curve = Curve::from_label(&token)
        .ok_or_else(|| PkiError::InvalidKey(format!("unknown public key type {token}")))?;
    check_length(curve, &bytes, false)?;
    Ok((curve, bytes))
}

pub fn unmarshal_private_key(input: &str) -> PkiResult<(Curve, Vec<u8>)> {
    let (token, bytes) = decode_key(input, PRIVATE_SUFFIX)?;
    let curve = Curve::from_label(&token)
        .ok_or_else(|| PkiError::InvalidKey(format!("unknown private key type {token}")))?;
    check_length(curve, &bytes, true)?;
    Ok((curve, bytes))
}

/// Check that `key_pem` holds the private key of the certificate in `cert_pem`.
pub fn verify_cert_and_key(cert_pem: &str, key_pem: &str) -> PkiResult<bool> {
    let (_, key) = decode_key(key_pem, PRIVATE_SUFFIX).map_err(|e| {
        PkiError::InvalidKey(format!("error while unmarshaling private key: {e}"))
    })?;
    let key = Zeroizing::new(key);

    let (cert, _) = Certificate::from_pem(cert_pem)?;
    cert.verify_private_key(&key)?;
    Ok(true)
}

fn key_label(product: Product, token: &str, suffix: &str) -> String {
    format!("{} {token} {suffix}", product.banner())
}

/// Decode a key block, returning its curve token and raw bytes.
fn decode_key(input: &str, suffix: &str) -> PkiResult<(String, Vec<u8>)> {
    let (block, _) = pem::decode(input).map_err(|e| PkiError::InvalidKey(e.to_string()))?;

    let token = Product::ALL.into_iter().find_map(|product| {
        block
            .label
            .strip_prefix(product.banner())
            .and_then(|rest| rest.strip_prefix(' '))
            .and_then(|rest| rest.strip_suffix(suffix))
            .and_then(|rest| rest.strip_suffix(' '))
            .map(str::to_string)
    });

    match token {
        Some(token) if !token.is_empty() => Ok((token, block.contents)),
        _ => Err(PkiError::InvalidKey(format!(
            "bytes did not contain a proper key banner, found {:?}",
            block.label
        ))),
    }
}

fn check_length(curve: Curve, key: &[u8], private: bool) -> PkiResult<()> {
    let expected = match (curve, private) {
        (Curve::X25519, _) => 32,
        (_, true) => 32,
        (_, false) => 65,
    };
    if key.len() != expected {
        return Err(PkiError::InvalidKey(format!(
            "key was not {expected} bytes, is invalid {} key",
            curve.label()
        )));
    }
    Ok(())
}
