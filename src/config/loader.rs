//! Settings loading from and saving to disk.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::settings::{SettingsError, SettingsTree};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for settings loading and persistence.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(SettingsError),
    Serialize(SettingsError),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) | ConfigError::Serialize(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Parse and validate settings markup.
pub fn parse_settings(content: &str) -> Result<SettingsTree, ConfigError> {
    let settings = SettingsTree::from_markup(content).map_err(ConfigError::Parse)?;
    validate_settings(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<SettingsTree, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_settings(&content)
}

/// Write settings to `path`.
///
/// The text goes to a sibling temporary file first and is renamed over the
/// target, so a failed write leaves the previous file intact.
pub fn save_settings(path: &Path, settings: &SettingsTree) -> Result<(), ConfigError> {
    let text = settings.to_markup().map_err(ConfigError::Serialize)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(ConfigError::Io(e));
    }
    Ok(())
}
