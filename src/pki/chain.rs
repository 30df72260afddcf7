//! Certificate chain parsing and per-certificate verdicts.
//!
//! Every certificate in the buffer is judged on its own; no issuer linking
//! is attempted between neighbours.

use serde::Serialize;
use time::OffsetDateTime;

use crate::observability::metrics;
use crate::pki::cert::Certificate;
use crate::pki::types::PkiResult;

/// Why a certificate was judged invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Expired,
    SignatureMismatch,
}

impl Rejection {
    pub fn reason(self) -> &'static str {
        match self {
            Rejection::Expired => "certificate is expired",
            Rejection::SignatureMismatch => "signature did not match",
        }
    }
}

/// Verdict attached to one parsed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validity {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validity {
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            valid: false,
            reason: Some(rejection.reason().to_string()),
        }
    }
}

/// One certificate from a PEM buffer with its canonical PEM and verdict.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord {
    pub raw_cert: String,
    pub cert: Certificate,
    pub validity: Validity,
}

/// Judge a certificate at `now`. Expiry is checked before the CA self-signature.
pub fn evaluate(cert: &Certificate, now: OffsetDateTime) -> Result<(), Rejection> {
    if cert.expired(now) {
        return Err(Rejection::Expired);
    }
    if cert.details.is_ca && !cert.check_signature(&cert.details.public_key) {
        return Err(Rejection::SignatureMismatch);
    }
    Ok(())
}

/// Parse every certificate in `input`, judged against the current time.
pub fn parse_certificates(input: &str) -> PkiResult<Vec<CertificateRecord>> {
    parse_certificates_at(input, OffsetDateTime::now_utc())
}

/// Parse every certificate in `input`, judged against `now`.
///
/// Any undecodable block fails the whole call.
pub fn parse_certificates_at(input: &str, now: OffsetDateTime) -> PkiResult<Vec<CertificateRecord>> {
    let mut records = Vec::new();
    let mut rest = input;

    while !rest.trim().is_empty() {
        let (cert, next) = Certificate::from_pem(rest)?;
        rest = next;

        let validity = match evaluate(&cert, now) {
            Ok(()) => {
                metrics::record_certificate("valid");
                Validity::valid()
            }
            Err(rejection) => {
                metrics::record_certificate(match rejection {
                    Rejection::Expired => "expired",
                    Rejection::SignatureMismatch => "signature",
                });
                tracing::debug!(
                    name = %cert.details.name,
                    reason = rejection.reason(),
                    "Certificate rejected"
                );
                Validity::rejected(rejection)
            }
        };

        records.push(CertificateRecord {
            raw_cert: cert.to_pem(),
            cert,
            validity,
        });
    }

    Ok(records)
}

/// JSON array form of parsed records.
pub fn certificates_to_json(records: &[CertificateRecord]) -> PkiResult<String> {
    Ok(serde_json::to_string(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::cert::tests::{ca_key, details, self_signed_ca};
    use crate::pki::cert::SigningMaterial;
    use crate::pki::types::{PkiError, Product};

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    fn host_cert(not_before: i64, not_after: i64) -> Certificate {
        let mut d = details("host", not_before, not_after);
        d.public_key = vec![1u8; 32];
        Certificate::sign(Product::Vlan, d, &SigningMaterial::Ed25519(ca_key())).unwrap()
    }

    #[test]
    fn test_preserves_order_and_count() {
        let ca = self_signed_ca(0, 10_000);
        let host = host_cert(0, 10_000);
        let input = format!("{}\n\n{}  \n", ca.to_pem(), host.to_pem());

        let records = parse_certificates_at(&input, at(5_000)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cert.details.name, "test ca");
        assert_eq!(records[1].cert.details.name, "host");
        assert!(records.iter().all(|r| r.validity == Validity::valid()));
    }

    #[test]
    fn test_raw_cert_round_trips() {
        let ca = self_signed_ca(0, 10_000);
        let records = parse_certificates_at(&ca.to_pem(), at(1)).unwrap();
        let (reparsed, _) = Certificate::from_pem(&records[0].raw_cert).unwrap();
        assert_eq!(reparsed, records[0].cert);
        assert_eq!(reparsed.to_bytes(), ca.to_bytes());
    }

    #[test]
    fn test_expired_wins_over_bad_signature() {
        let mut ca = self_signed_ca(0, 10_000);
        ca.signature[0] ^= 0xff;

        let records = parse_certificates_at(&ca.to_pem(), at(20_000)).unwrap();
        assert_eq!(records[0].validity, Validity::rejected(Rejection::Expired));

        let records = parse_certificates_at(&ca.to_pem(), at(5_000)).unwrap();
        assert_eq!(
            records[0].validity.reason.as_deref(),
            Some("signature did not match")
        );
    }

    #[test]
    fn test_not_yet_valid_is_expired() {
        let host = host_cert(5_000, 10_000);
        let records = parse_certificates_at(&host.to_pem(), at(10)).unwrap();
        assert_eq!(
            records[0].validity.reason.as_deref(),
            Some("certificate is expired")
        );
    }

    #[test]
    fn test_host_signature_not_checked() {
        let mut host = host_cert(0, 10_000);
        host.signature = vec![0u8; 64];
        let records = parse_certificates_at(&host.to_pem(), at(10)).unwrap();
        assert!(records[0].validity.valid);
    }

    #[test]
    fn test_malformed_block_discards_everything() {
        let ca = self_signed_ca(0, 10_000);
        let input = format!(
            "{}-----BEGIN VLAN CERTIFICATE-----\n@@@@\n-----END VLAN CERTIFICATE-----\n",
            ca.to_pem()
        );
        assert!(matches!(
            parse_certificates_at(&input, at(1)),
            Err(PkiError::MalformedCertificate(_))
        ));

        let trailing = format!("{}garbage", ca.to_pem());
        assert!(parse_certificates_at(&trailing, at(1)).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_certificates_at("", at(1)).unwrap().is_empty());
        assert!(parse_certificates_at(" \n\t", at(1)).unwrap().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let ca = self_signed_ca(0, 10_000);
        let records = parse_certificates_at(&ca.to_pem(), at(20_000)).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&certificates_to_json(&records).unwrap()).unwrap();

        let first = &json[0];
        assert_eq!(first["raw_cert"], ca.to_pem());
        assert_eq!(first["cert"]["details"]["name"], "test ca");
        assert_eq!(first["validity"]["valid"], false);
        assert_eq!(first["validity"]["reason"], "certificate is expired");
    }
}
