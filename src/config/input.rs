//! Typed views of the JSON supplied by the mobile host.
//!
//! Each view is a serde derive decoded through `serde_path_to_error`, so a
//! mismatch names the full path of the offending field (`routeTable[1].via`).
//! Keys a view does not name are ignored and JSON `null` reads as absent.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::synth::SynthesisError;

/// Parsed input document; the root must be a JSON object.
#[derive(Debug, Clone)]
pub struct InputDocument {
    root: Value,
}

impl InputDocument {
    pub fn parse(text: &str) -> Result<Self, SynthesisError> {
        let root: Value = serde_json::from_str(text)?;
        if !root.is_object() {
            return Err(SynthesisError::FieldType {
                field: ".".to_string(),
                message: "expected a JSON object".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Decode the document as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SynthesisError> {
        serde_path_to_error::deserialize(&self.root).map_err(|err| SynthesisError::FieldType {
            field: err.path().to_string(),
            message: err.inner().to_string(),
        })
    }
}

/// Keys shared by every variant.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonInput {
    pub ca: Option<String>,
    pub cert: Option<String>,
    pub port: Option<u16>,
    pub cipher: Option<String>,
    pub log_verbosity: Option<String>,
    pub lh_duration: Option<u64>,
    pub mtu: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteInput {
    pub route: String,
    pub via: String,
    pub mtu: Option<u32>,
}

/// VLAN app document: flat endpoint lists and a `routeTable`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanInput {
    pub points: Option<BTreeMap<String, Option<Vec<String>>>>,
    pub route_table: Option<Vec<RouteInput>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HiperPoint {
    pub destinations: Option<Vec<String>>,
}

/// HiPer app document: nested points, `unsafeRoutes` and an optional key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiperInput {
    pub key: Option<String>,
    pub point: Option<BTreeMap<String, Option<HiperPoint>>>,
    pub unsafe_routes: Option<Vec<RouteInput>>,
}
