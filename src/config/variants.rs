//! Input variant adapters.
//!
//! Each product's mobile app ships its own JSON shape. An adapter maps one
//! shape onto the single canonical schema; the schema itself is shared.
//!
//! | key            | vlan                       | hiper                               |
//! |----------------|----------------------------|-------------------------------------|
//! | `points`       | addr → `[endpoint]`        |                                     |
//! | `point`        |                            | addr → `{destinations: [endpoint]}` |
//! | `routeTable`   | `[{route, via}]`           |                                     |
//! | `unsafeRoutes` |                            | `[{route, via, mtu?}]`              |
//! | `key`          |                            | used when no key is supplied        |

use std::fmt;
use std::str::FromStr;

use crate::config::input::{CommonInput, HiperInput, InputDocument, RouteInput, VlanInput};
use crate::config::schema::{CanonicalConfig, RouteTableEntry};
use crate::config::synth::SynthesisError;
use crate::pki::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputVariant {
    #[default]
    Vlan,
    Hiper,
}

impl InputVariant {
    pub fn product(self) -> Product {
        match self {
            InputVariant::Vlan => Product::Vlan,
            InputVariant::Hiper => Product::Hiper,
        }
    }

    /// Canonical defaults for this variant.
    pub fn defaults(self) -> CanonicalConfig {
        let mut config = CanonicalConfig::default();
        if self == InputVariant::Hiper {
            config.tun.dev = "tun1".to_string();
        }
        config
    }

    /// Overlay the fields present in `doc` onto `config`.
    pub fn apply(
        self,
        doc: &InputDocument,
        key: &str,
        config: &mut CanonicalConfig,
    ) -> Result<(), SynthesisError> {
        apply_common(doc.decode()?, config);

        config.pki.key = key.to_string();

        match self {
            InputVariant::Vlan => {
                let input: VlanInput = doc.decode()?;
                for (addr, endpoints) in input.points.unwrap_or_default() {
                    if let Some(endpoints) = endpoints {
                        config.points.insert(addr, endpoints);
                    }
                }
                if let Some(routes) = input.route_table {
                    config.tun.route_table = route_entries(routes, false);
                }
            }
            InputVariant::Hiper => {
                let input: HiperInput = doc.decode()?;
                if key.is_empty() {
                    if let Some(doc_key) = input.key {
                        config.pki.key = doc_key;
                    }
                }
                for (addr, point) in input.point.unwrap_or_default() {
                    if let Some(point) = point {
                        config
                            .points
                            .insert(addr, point.destinations.unwrap_or_default());
                    }
                }
                if let Some(routes) = input.unsafe_routes {
                    config.tun.route_table = route_entries(routes, true);
                }
            }
        }

        Ok(())
    }
}

fn apply_common(input: CommonInput, config: &mut CanonicalConfig) {
    if let Some(ca) = input.ca {
        config.pki.ca = ca;
    }
    if let Some(cert) = input.cert {
        config.pki.cert = cert;
    }
    if let Some(port) = input.port {
        config.listen.port = port;
    }
    if let Some(cipher) = input.cipher.filter(|c| !c.is_empty()) {
        config.cipher = cipher;
    }
    if let Some(level) = input.log_verbosity.filter(|l| !l.is_empty()) {
        config.logging.level = level;
    }
    if let Some(interval) = input.lh_duration {
        config.tower.interval = interval;
    }
    if let Some(mtu) = input.mtu {
        config.tun.mtu = mtu;
    }
}

/// Per-route MTU is only carried by the HiPer shape.
fn route_entries(routes: Vec<RouteInput>, with_mtu: bool) -> Vec<RouteTableEntry> {
    routes
        .into_iter()
        .map(|route| RouteTableEntry {
            route: route.route,
            via: route.via,
            mtu: route.mtu.filter(|_| with_mtu),
            ..RouteTableEntry::default()
        })
        .collect()
}

impl fmt::Display for InputVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputVariant::Vlan => "vlan",
            InputVariant::Hiper => "hiper",
        })
    }
}

impl FromStr for InputVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vlan" => Ok(InputVariant::Vlan),
            "hiper" => Ok(InputVariant::Hiper),
            other => Err(format!("unknown input variant: {other}")),
        }
    }
}
