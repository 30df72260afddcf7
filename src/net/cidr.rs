//! CIDR literal parsing.
//!
//! # Design Decisions
//! - IPv4 only; the mask is reported as a dotted quad
//! - The prefix length must be plain decimal digits in `0..=32`
//! - Pure function of the input string, no lookups

use serde::Serialize;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Errors produced while parsing a CIDR literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrError {
    /// The literal is not `a.b.c.d/len`.
    #[error("invalid CIDR address {input:?}: {reason}")]
    InvalidCidr { input: String, reason: &'static str },
}

/// Parsed form of a CIDR literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CidrInfo {
    /// Host address exactly as written.
    pub address: Ipv4Addr,
    /// Netmask in dotted-quad form.
    pub mask_cidr: Ipv4Addr,
    /// Prefix length in bits.
    pub mask_size: u8,
    /// Network (base) address.
    pub network: Ipv4Addr,
}

/// Netmask with the top `prefix` bits set.
pub fn prefix_to_mask(prefix: u8) -> Ipv4Addr {
    let bits = match prefix {
        0 => 0,
        p if p >= 32 => u32::MAX,
        p => u32::MAX << (32 - u32::from(p)),
    };
    Ipv4Addr::from(bits)
}

/// Parse a CIDR literal such as `10.0.0.5/24`.
pub fn parse_cidr(input: &str) -> Result<CidrInfo, CidrError> {
    let invalid = |reason| CidrError::InvalidCidr {
        input: input.to_string(),
        reason,
    };

    let (addr, prefix) = input.split_once('/').ok_or_else(|| invalid("missing prefix length"))?;

    let address: Ipv4Addr = addr.parse().map_err(|_| invalid("bad address"))?;

    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("prefix length is not a number"));
    }
    let mask_size: u8 = prefix.parse().map_err(|_| invalid("prefix length out of range"))?;
    if mask_size > 32 {
        return Err(invalid("prefix length out of range"));
    }

    let mask_cidr = prefix_to_mask(mask_size);
    let network = Ipv4Addr::from(u32::from(address) & u32::from(mask_cidr));

    Ok(CidrInfo {
        address,
        mask_cidr,
        mask_size,
        network,
    })
}
