//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pki, config, sync, engine
//!     → logging.rs (tracing events, text or json)
//!     → metrics.rs (counters through the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Key material and rendered configs are never logged
//! - The library installs no metrics recorder; the host chooses one

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
