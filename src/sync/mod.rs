//! Remote settings sync.
//!
//! ```text
//! SyncTask (interval loop, owned by the host)
//!     → SyncAgent::run_cycle
//!         ├─ check_primary:  sync.source   → Fetcher → full replacement (when pki.ca set)
//!         └─ check_addition: sync.addition → Fetcher → deep merge into live settings
//!     → ConfigStore writer: persist, then reload
//! ```
//!
//! Every failure inside a check is logged and reported in its
//! [`CheckOutcome`]; nothing here aborts the host.

pub mod agent;
pub mod fetch;
pub mod source;
pub mod task;

pub use agent::{CycleReport, SyncAgent};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use source::{resolve_addition, resolve_source, DEFAULT_SOURCE_TEMPLATE};
pub use task::{SyncTask, DEFAULT_SYNC_INTERVAL};

use thiserror::Error;

use crate::config::{ConfigError, ReloadError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unsupported sync source: {0}")]
    UnsupportedSource(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("could not parse fetched settings: {0}")]
    Parse(String),

    #[error("could not persist settings: {0}")]
    Persist(#[from] ConfigError),

    #[error("reload failed: {0}")]
    Reload(#[from] ReloadError),
}

/// What one check did to the live settings.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Nothing configured for this check.
    Skipped,
    /// The configured source could not be turned into a URL.
    Rejected(SyncError),
    /// Fetch or parse failed; settings untouched.
    Failed(SyncError),
    /// Fetched settings were taken in.
    Applied { adopted: bool, persisted: bool },
}

impl CheckOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Skipped => "skipped",
            CheckOutcome::Rejected(_) => "rejected",
            CheckOutcome::Failed(_) => "failed",
            CheckOutcome::Applied { .. } => "applied",
        }
    }
}

/// Outcome of one check plus the reload it ended with, if any.
#[derive(Debug)]
pub struct CheckReport {
    pub outcome: CheckOutcome,
    pub reload: Option<Result<(), ReloadError>>,
}

impl CheckReport {
    fn without_reload(outcome: CheckOutcome) -> Self {
        Self {
            outcome,
            reload: None,
        }
    }

    pub fn reloaded(&self) -> bool {
        self.reload.is_some()
    }
}
