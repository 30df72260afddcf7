//! Live settings shared between the engine and the sync agent.
//!
//! Readers take lock-free snapshots through `ArcSwap`. Writers go through
//! [`ConfigStore::lock`], which serializes merge, replace, persist and
//! reload so a reload always observes what the same writer just saved.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::loader::{load_settings, save_settings, ConfigError};
use crate::config::settings::{SettingsError, SettingsTree};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to render settings: {0}")]
    Render(#[from] SettingsError),

    #[error("engine rejected configuration: {0}")]
    Rejected(String),
}

/// Applies rendered settings to whatever runs them.
#[async_trait]
pub trait Reloader: Send + Sync {
    async fn reload(&self, markup: &str) -> Result<(), ReloadError>;
}

/// Reloader for stores with nothing running behind them.
#[derive(Debug, Default)]
pub struct DetachedReloader;

#[async_trait]
impl Reloader for DetachedReloader {
    async fn reload(&self, _markup: &str) -> Result<(), ReloadError> {
        tracing::debug!("No engine attached, reload skipped");
        Ok(())
    }
}

pub struct ConfigStore {
    path: Option<PathBuf>,
    current: ArcSwap<SettingsTree>,
    writer: Mutex<()>,
    reloader: Arc<dyn Reloader>,
}

impl ConfigStore {
    pub fn new(settings: SettingsTree, path: Option<PathBuf>, reloader: Arc<dyn Reloader>) -> Self {
        Self {
            path,
            current: ArcSwap::from_pointee(settings),
            writer: Mutex::new(()),
            reloader,
        }
    }

    /// Load settings from `path` and keep persisting there.
    pub fn open(path: &Path, reloader: Arc<dyn Reloader>) -> Result<Self, ConfigError> {
        let settings = load_settings(path)?;
        tracing::info!(path = ?path, "Settings loaded");
        Ok(Self::new(settings, Some(path.to_path_buf()), reloader))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Arc<SettingsTree> {
        self.current.load_full()
    }

    pub fn get_string(&self, path: &str) -> Option<String> {
        self.current.load().get_string(path)
    }

    /// Acquire the writer side. Held across a save-then-reload sequence.
    pub async fn lock(&self) -> ConfigWriter<'_> {
        ConfigWriter {
            store: self,
            _guard: self.writer.lock().await,
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Exclusive write access to a [`ConfigStore`].
pub struct ConfigWriter<'a> {
    store: &'a ConfigStore,
    _guard: MutexGuard<'a, ()>,
}

impl ConfigWriter<'_> {
    pub fn settings(&self) -> Arc<SettingsTree> {
        self.store.snapshot()
    }

    pub fn replace(&mut self, settings: SettingsTree) {
        self.store.current.store(Arc::new(settings));
    }

    pub fn merge(&mut self, overlay: SettingsTree) {
        let mut merged = SettingsTree::clone(&self.store.current.load());
        merged.merge(overlay);
        self.store.current.store(Arc::new(merged));
    }

    /// Write the live settings to the store's path.
    ///
    /// Returns `false` when the store has no path.
    pub fn persist(&self) -> Result<bool, ConfigError> {
        let Some(path) = self.store.path.as_deref() else {
            tracing::debug!("Settings have no path, persist skipped");
            return Ok(false);
        };
        save_settings(path, &self.store.current.load())?;
        tracing::info!(path = ?path, "Settings persisted");
        Ok(true)
    }

    /// Hand the live settings to the reloader.
    pub async fn reload(&self) -> Result<(), ReloadError> {
        let markup = self.store.current.load().to_markup()?;
        let result = self.store.reloader.reload(&markup).await;
        metrics::record_reload(result.is_ok());
        result
    }
}
