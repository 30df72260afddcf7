//! Config synthesis from mobile JSON.
//!
//! ```text
//! mobile JSON + private key
//!     → InputDocument (serde views with field paths)
//!     → InputVariant::defaults() then apply()
//!     → CanonicalConfig
//!     → TOML text handed to the engine
//! ```
//!
//! Synthesis works on a local tree and only returns it once every field has
//! been applied, so a type error never leaves a half-built config behind.

use thiserror::Error;

use crate::config::input::InputDocument;
use crate::config::schema::CanonicalConfig;
use crate::config::settings::{SettingsError, SettingsTree};
use crate::config::validation::{validate_settings, ValidationError};
use crate::config::variants::InputVariant;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("input is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("config field `{field}` is invalid: {message}")]
    FieldType { field: String, message: String },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("rendered config could not be loaded: {0}")]
    Reparse(#[from] SettingsError),

    #[error("rendered config is invalid: {}", join(.0))]
    Invalid(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the canonical config for `json` under `variant`.
pub fn synthesize(
    json: &str,
    key: &str,
    variant: InputVariant,
) -> Result<CanonicalConfig, SynthesisError> {
    let doc = InputDocument::parse(json)?;
    let mut config = variant.defaults();
    variant.apply(&doc, key, &mut config)?;
    Ok(config)
}

/// Render a VLAN mobile document to engine markup.
pub fn render_config(json: &str, key: &str) -> Result<String, SynthesisError> {
    render_config_with(json, key, InputVariant::Vlan)
}

pub fn render_config_with(
    json: &str,
    key: &str,
    variant: InputVariant,
) -> Result<String, SynthesisError> {
    let config = synthesize(json, key, variant)?;
    Ok(config.to_markup()?)
}

/// Render, reload and validate a document without starting anything.
///
/// Returns the config as the engine would see it.
pub fn test_config(
    json: &str,
    key: &str,
    variant: InputVariant,
) -> Result<CanonicalConfig, SynthesisError> {
    let markup = render_config_with(json, key, variant)?;
    let settings = SettingsTree::from_markup(&markup)?;
    validate_settings(&settings).map_err(SynthesisError::Invalid)?;
    Ok(settings.to_canonical()?)
}

/// Read one dotted setting from rendered markup.
///
/// Returns `None` when the markup does not parse or the key is missing.
pub fn get_config_setting(markup: &str, setting: &str) -> Option<String> {
    SettingsTree::from_markup(markup).ok()?.get_string(setting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_and_points_only() {
        let config = synthesize(
            r#"{"port":4242,"points":{"6.6.6.6":["1.2.3.4:4242"]}}"#,
            "",
            InputVariant::Vlan,
        )
        .unwrap();

        let mut expected = CanonicalConfig::default();
        expected.listen.port = 4242;
        expected
            .points
            .insert("6.6.6.6".to_string(), vec!["1.2.3.4:4242".to_string()]);
        assert_eq!(config, expected);
    }

    #[test]
    fn test_common_fields() {
        let config = synthesize(
            r#"{"ca": "CA", "cert": "CERT", "cipher": "chachapoly", "logVerbosity": "debug",
                "lhDuration": 7200, "mtu": 1400, "unknown": {"ignored": true}}"#,
            "KEY",
            InputVariant::Vlan,
        )
        .unwrap();

        assert_eq!(config.pki.ca, "CA");
        assert_eq!(config.pki.cert, "CERT");
        assert_eq!(config.pki.key, "KEY");
        assert_eq!(config.cipher, "chachapoly");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.tower.interval, 7200);
        assert_eq!(config.tun.mtu, 1400);
    }

    #[test]
    fn test_empty_strings_keep_defaults() {
        let config = synthesize(r#"{"cipher": "", "logVerbosity": ""}"#, "", InputVariant::Vlan)
            .unwrap();
        assert_eq!(config.cipher, "aes");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_type_mismatch_names_field() {
        let err = synthesize(r#"{"port": "4242"}"#, "", InputVariant::Vlan).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("config field `port` is invalid: invalid type: string"),
            "{err}"
        );

        let err = synthesize(r#"{"points": {"6.6.6.6": "1.2.3.4"}}"#, "", InputVariant::Vlan)
            .unwrap_err();
        assert!(matches!(err, SynthesisError::FieldType { ref field, .. } if field == "points.6.6.6.6"));
    }

    #[test]
    fn test_render_and_read_back() {
        let markup = render_config(r#"{"port": 4242}"#, "").unwrap();
        assert_eq!(get_config_setting(&markup, "listen.port").as_deref(), Some("4242"));
        assert_eq!(get_config_setting(&markup, "tun.dev").as_deref(), Some("vlan"));
        assert_eq!(get_config_setting(&markup, "listen.nope"), None);
        assert_eq!(get_config_setting("not [ markup", "listen.port"), None);
    }

    #[test]
    fn test_test_config_accepts_and_rejects() {
        let config = test_config(r#"{"port": 4242}"#, "", InputVariant::Hiper).unwrap();
        assert_eq!(config.tun.dev, "tun1");

        let err = test_config(r#"{"cipher": "rot13"}"#, "", InputVariant::Vlan).unwrap_err();
        assert!(matches!(err, SynthesisError::Invalid(ref errors) if errors[0].field == "cipher"));

        assert!(matches!(
            test_config("{", "", InputVariant::Vlan),
            Err(SynthesisError::InvalidJson(_))
        ));
    }
}
