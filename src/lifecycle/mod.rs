//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every ShutdownSignal resolves → periodic tasks exit
//!
//! Signals (signals.rs):
//!     SIGINT / Ctrl-C → trigger()
//! ```
//!
//! # Design Decisions
//! - Host-owned tasks (the sync timer) take a ShutdownSignal, never a timer of their own
//! - A signal subscribed after the trigger still observes it

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
