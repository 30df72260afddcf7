//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! mobile JSON + key
//!     → input.rs (typed field access)
//!     → variants.rs (per-product adapter onto the schema)
//!     → synth.rs (CanonicalConfig → TOML text)
//!     → engine
//!
//! On a sync cycle:
//!     fetched document → settings.rs (SettingsTree, deep merge)
//!     → validation.rs (shape, ranges, durations)
//!     → store.rs (swap live tree, persist via loader.rs, reload)
//! ```
//!
//! # Design Decisions
//! - One canonical schema; product differences live in small adapters
//! - All fields have defaults so every synthesized config is complete
//! - Validation separates syntactic (serde) from semantic checks
//! - Readers never block on writers; writers are serialized

pub mod duration;
pub mod input;
pub mod loader;
pub mod schema;
pub mod settings;
pub mod store;
pub mod synth;
pub mod validation;
pub mod variants;

pub use loader::{load_settings, parse_settings, save_settings, ConfigError};
pub use schema::CanonicalConfig;
pub use settings::{merge_tables, SettingsError, SettingsTree};
pub use store::{ConfigStore, ConfigWriter, DetachedReloader, ReloadError, Reloader};
pub use synth::{
    get_config_setting, render_config, render_config_with, synthesize, test_config, SynthesisError,
};
pub use validation::{validate_settings, ValidationError};
pub use variants::InputVariant;
