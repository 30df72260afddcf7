//! Untyped settings tree and the overlay merge.
//!
//! # Merge Rules
//! - A table in the overlay merges recursively into a table in the base
//! - Any other overlay value (scalars and arrays) replaces the base value
//! - Keys absent from the overlay are left untouched

use serde_json::Value as JsonValue;
use thiserror::Error;
use toml::{Table, Value};

use crate::config::schema::CanonicalConfig;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid markup: {0}")]
    Markup(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document root must be a table")]
    NotATable,

    #[error("failed to render settings: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Nested settings mapping, the substrate for merges and persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree(Table);

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_table(&self) -> &Table {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse engine markup (TOML).
    pub fn from_markup(text: &str) -> Result<Self, SettingsError> {
        Ok(Self(text.parse::<Table>()?))
    }

    /// Parse a JSON object. `null` members are dropped.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        match serde_json::from_str::<JsonValue>(text)? {
            JsonValue::Object(map) => Ok(Self(json_object_to_table(map))),
            _ => Err(SettingsError::NotATable),
        }
    }

    pub fn from_config(config: &CanonicalConfig) -> Result<Self, SettingsError> {
        match Value::try_from(config)? {
            Value::Table(table) => Ok(Self(table)),
            _ => Err(SettingsError::NotATable),
        }
    }

    pub fn to_markup(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string(&self.0)?)
    }

    /// Decode into the canonical schema, filling defaults for absent keys.
    pub fn to_canonical(&self) -> Result<CanonicalConfig, SettingsError> {
        Ok(Value::Table(self.0.clone()).try_into()?)
    }

    /// Look up a dotted path such as `pki.ca`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// Scalar at `path` rendered as a string; `None` for tables and arrays.
    pub fn get_string(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Datetime(d) => Some(d.to_string()),
            Value::Array(_) | Value::Table(_) => None,
        }
    }

    /// True when `path` holds a non-empty string.
    pub fn has_text(&self, path: &str) -> bool {
        self.get_str(path).is_some_and(|s| !s.is_empty())
    }

    pub fn merge(&mut self, overlay: SettingsTree) {
        merge_tables(&mut self.0, overlay.0);
    }
}

/// Deep-merge `overlay` into `base`.
pub fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn json_object_to_table(map: serde_json::Map<String, JsonValue>) -> Table {
    map.into_iter()
        .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
        .collect()
}

fn json_to_toml(value: JsonValue) -> Option<Value> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(Value::Boolean(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        JsonValue::String(s) => Some(Value::String(s)),
        JsonValue::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        JsonValue::Object(map) => Some(Value::Table(json_object_to_table(map))),
    }
}
