//! Settings validation.
//!
//! # Responsibilities
//! - Shape checks on an untyped settings tree before it is accepted
//! - Value ranges (ports, MTU) and duration syntax
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: SettingsTree → Result<(), Vec<ValidationError>>
//! - Unknown keys are allowed; the engine may understand more than we do

use std::fmt;
use toml::Value;

use crate::config::duration::parse_duration;
use crate::config::settings::SettingsTree;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

const SECTIONS: &[&str] = &[
    "sync", "pki", "points", "tower", "listen", "punchy", "sshd", "ssh", "proxy", "tun", "logging",
    "stats", "handshakes", "timers", "psk", "firewall",
];

const STRINGS: &[&str] = &[
    "cipher",
    "pki.ca",
    "pki.cert",
    "pki.key",
    "listen.addr",
    "tun.dev",
    "logging.level",
    "logging.format",
    "psk.mode",
    "firewall.outbound_action",
    "firewall.inbound_action",
    "sync.source",
    "sync.store",
    "sync.addition",
];

const PORTS: &[&str] = &["listen.port", "tower.dns.port", "sshd.port", "ssh.port"];

const DURATIONS: &[&str] = &[
    "punchy.delay",
    "punchy.frequency",
    "punchy.respond_delay",
    "handshakes.try_interval",
    "handshakes.churn_period",
    "firewall.conntrack.tcp_timeout",
    "firewall.conntrack.udp_timeout",
    "firewall.conntrack.default_timeout",
    "pki.expiry_check.time_left",
    "pki.expiry_check.log_interval",
    "sync.interval",
];

const CIPHERS: &[&str] = &["aes", "chachapoly"];

/// Validate a settings tree, collecting every problem found.
pub fn validate_settings(settings: &SettingsTree) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for section in SECTIONS {
        if let Some(value) = settings.get(section) {
            if !value.is_table() {
                errors.push(ValidationError::new(section, "must be a table"));
            }
        }
    }

    for field in STRINGS {
        if let Some(value) = settings.get(field) {
            if !value.is_str() {
                errors.push(ValidationError::new(field, "must be a string"));
            }
        }
    }

    if let Some(cipher) = settings.get_str("cipher") {
        if !cipher.is_empty() && !CIPHERS.contains(&cipher) {
            errors.push(ValidationError::new(
                "cipher",
                format!("unknown cipher {cipher:?}, expected aes or chachapoly"),
            ));
        }
    }

    for field in PORTS {
        if let Some(value) = settings.get(field) {
            match value.as_integer() {
                Some(port) if (0..=65535).contains(&port) => {}
                _ => errors.push(ValidationError::new(
                    field,
                    "must be an integer between 0 and 65535",
                )),
            }
        }
    }

    if let Some(value) = settings.get("tun.mtu") {
        match value.as_integer() {
            Some(mtu) if mtu > 0 => {}
            _ => errors.push(ValidationError::new("tun.mtu", "must be a positive integer")),
        }
    }

    if let Some(Value::Table(points)) = settings.get("points") {
        for (addr, endpoints) in points {
            let ok = endpoints
                .as_array()
                .is_some_and(|list| list.iter().all(Value::is_str));
            if !ok {
                errors.push(ValidationError::new(
                    &format!("points.{addr}"),
                    "must be a list of strings",
                ));
            }
        }
    }

    for field in DURATIONS {
        match settings.get(field) {
            None => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::String(s)) => {
                if let Err(e) = parse_duration(s) {
                    errors.push(ValidationError::new(field, e.to_string()));
                }
            }
            Some(_) => errors.push(ValidationError::new(field, "must be a duration string")),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::CanonicalConfig;

    fn markup(text: &str) -> SettingsTree {
        SettingsTree::from_markup(text).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let tree = SettingsTree::from_config(&CanonicalConfig::default()).unwrap();
        assert_eq!(validate_settings(&tree), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let tree = markup(
            r#"
            cipher = "rot13"
            pki = "flat"

            [listen]
            port = 70000

            [tun]
            mtu = 0

            [points]
            "6.6.6.6" = ["1.2.3.4:4242", 5]

            [handshakes]
            try_interval = "soon"
            "#,
        );

        let errors = validate_settings(&tree).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "pki",
                "cipher",
                "listen.port",
                "tun.mtu",
                "points.6.6.6.6",
                "handshakes.try_interval"
            ]
        );
    }

    #[test]
    fn test_string_fields_and_durations() {
        let tree = markup("[pki]\nca = 5\n[sync]\ninterval = 15\n");
        let errors = validate_settings(&tree).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].to_string(), "pki.ca: must be a string");
        assert_eq!(errors[1].field, "sync.interval");
    }

    #[test]
    fn test_empty_tree_is_valid() {
        assert!(validate_settings(&SettingsTree::new()).is_ok());
    }
}
