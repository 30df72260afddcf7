//! Resolution of configured sync sources into URLs.

use url::Url;

use crate::sync::SyncError;

/// Where bare identifiers are fetched from; `{id}` is replaced.
pub const DEFAULT_SOURCE_TEMPLATE: &str = "https://cert.mcer.cn/{id}.toml";

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub fn is_base58(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Resolve a primary source: a base58 identifier or an http(s) URL.
pub fn resolve_source(source: &str, template: &str) -> Result<Url, SyncError> {
    let source = source.trim();
    if is_base58(source) {
        let expanded = template.replace("{id}", source);
        return http_url(&expanded);
    }
    http_url(source)
}

/// Resolve an addition source, which must be an http(s) URL.
pub fn resolve_addition(addition: &str) -> Result<Url, SyncError> {
    http_url(addition.trim())
}

fn http_url(candidate: &str) -> Result<Url, SyncError> {
    let url = Url::parse(candidate)
        .map_err(|_| SyncError::UnsupportedSource(candidate.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SyncError::UnsupportedSource(candidate.to_string())),
    }
}
