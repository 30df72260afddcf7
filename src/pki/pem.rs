//! PEM framing for product certificates and keys.
//!
//! Parsing and encoding are done by the `pem` crate. This module adds the
//! chained-buffer walk: [`decode`] hands back whatever follows the first
//! block so callers can read concatenated certificates one at a time.

use ::pem::{EncodeConfig, LineEnding, Pem};
use thiserror::Error;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const DASHES: &str = "-----";

#[derive(Debug, Error)]
pub enum PemError {
    #[error("input did not contain a valid PEM encoded block")]
    NoBlock,

    #[error("PEM block {0:?} is not terminated")]
    Unterminated(String),

    #[error("PEM block {label:?} is malformed: {source}")]
    Malformed {
        label: String,
        #[source]
        source: ::pem::PemError,
    },
}

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub contents: Vec<u8>,
}

/// Decodes the first PEM block in `input`.
///
/// Returns the block together with whatever follows its END line.
pub fn decode(input: &str) -> Result<(PemBlock, &str), PemError> {
    let start = input.find(BEGIN).ok_or(PemError::NoBlock)?;
    let after_begin = &input[start + BEGIN.len()..];

    let label_end = after_begin.find(DASHES).ok_or(PemError::NoBlock)?;
    let label = &after_begin[..label_end];
    if label.contains('\n') {
        return Err(PemError::NoBlock);
    }

    let footer = format!("{END}{label}{DASHES}");
    let footer_at = input[start..]
        .find(&footer)
        .ok_or_else(|| PemError::Unterminated(label.to_string()))?;
    let block_end = start + footer_at + footer.len();

    let parsed = ::pem::parse(&input[start..block_end]).map_err(|source| PemError::Malformed {
        label: label.to_string(),
        source,
    })?;

    let mut rest = &input[block_end..];
    if let Some(stripped) = rest.strip_prefix("\r\n") {
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('\n') {
        rest = stripped;
    }

    Ok((
        PemBlock {
            label: parsed.tag().to_string(),
            contents: parsed.into_contents(),
        },
        rest,
    ))
}

/// Encodes `contents` as a PEM block with the given label, LF line endings.
pub fn encode(label: &str, contents: &[u8]) -> String {
    let block = Pem::new(label, contents.to_vec());
    ::pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}
