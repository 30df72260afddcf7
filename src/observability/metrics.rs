//! Counters for certificate parsing, sync checks and reloads.
//!
//! # Metrics
//! - `vlan_certificates_parsed_total` (counter): parsed certificates by verdict
//! - `vlan_sync_checks_total` (counter): sync checks by check and outcome
//! - `vlan_config_reloads_total` (counter): engine reloads by result
//!
//! No recorder is installed here; without one the macros are no-ops.

/// Record one parsed certificate and its verdict (`valid`, `expired`, `signature`).
pub fn record_certificate(verdict: &'static str) {
    ::metrics::counter!("vlan_certificates_parsed_total", "verdict" => verdict).increment(1);
}

/// Record the outcome of a sync check (`primary` or `addition`).
pub fn record_sync_check(check: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "vlan_sync_checks_total",
        "check" => check,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a reload attempt.
pub fn record_reload(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("vlan_config_reloads_total", "result" => result).increment(1);
}
