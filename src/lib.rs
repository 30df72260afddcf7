//! Mobile-side support library for the VLAN overlay network.
//!
//! Certificate and key handling, CIDR parsing, synthesis of engine settings
//! from the host app's JSON, remote settings sync, and a control wrapper
//! around the tunnel engine.

pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pki;
pub mod sync;

pub use config::{render_config, CanonicalConfig, ConfigStore, InputVariant, SettingsTree};
pub use engine::{Control, Engine};
pub use lifecycle::Shutdown;
pub use net::parse_cidr;
pub use pki::{generate_key_pair, parse_certificates, verify_cert_and_key};
pub use sync::{SyncAgent, SyncTask};
