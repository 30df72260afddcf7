//! Host-facing control over a running engine.

use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{parse_settings, ConfigError, ConfigStore, ReloadError, SettingsTree};
use crate::engine::{Engine, EngineReloader};

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("could not parse vpn address: {0}")]
    InvalidEndpoint(String),

    #[error("could not parse udp address")]
    InvalidRemote,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// An engine paired with the settings it runs from.
pub struct Control {
    engine: Arc<dyn Engine>,
    store: Arc<ConfigStore>,
}

impl Control {
    pub fn new(engine: Arc<dyn Engine>, settings: SettingsTree) -> Self {
        let reloader = Arc::new(EngineReloader::new(engine.clone()));
        let store = Arc::new(ConfigStore::new(settings, None, reloader));
        Self { engine, store }
    }

    /// Start from rendered markup, as handed over by the host app.
    pub fn from_markup(engine: Arc<dyn Engine>, markup: &str) -> Result<Self, ControlError> {
        let settings = parse_settings(markup)?;
        Ok(Self::new(engine, settings))
    }

    /// Start from a settings file; sync results are persisted back to it.
    pub fn open(engine: Arc<dyn Engine>, path: &Path) -> Result<Self, ControlError> {
        let reloader = Arc::new(EngineReloader::new(engine.clone()));
        let store = Arc::new(ConfigStore::open(path, reloader)?);
        Ok(Self { engine, store })
    }

    /// Live settings, for handing to a [`SyncAgent`](crate::sync::SyncAgent).
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    pub fn start(&self) {
        tracing::info!("Starting engine");
        self.engine.start();
    }

    pub fn stop(&self) {
        tracing::info!("Stopping engine");
        self.engine.stop();
    }

    /// Wait on a blocking thread until the engine has stopped.
    pub async fn shutdown_block(&self) {
        let engine = self.engine.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || engine.shutdown_block()).await {
            tracing::error!(error = %err, "Engine shutdown task failed");
        }
    }

    pub fn rebind(&self, reason: &str) {
        tracing::debug!(reason, "Rebinding UDP listener and updating towers");
        self.engine.rebind();
    }

    /// Replace the live settings with `markup` and reload the engine.
    pub async fn reload(&self, markup: &str) -> Result<(), ControlError> {
        tracing::info!("Reloading engine");
        let settings = parse_settings(markup)?;
        let mut writer = self.store.lock().await;
        writer.replace(settings);
        writer.reload().await?;
        Ok(())
    }

    pub fn list_points(&self, include_pending: bool) -> Result<String, ControlError> {
        to_json(&self.engine.list_points(include_pending))
    }

    /// JSON for one point, `null` when the engine has no tunnel to it.
    pub fn point_info(&self, endpoint: &str, include_pending: bool) -> Result<String, ControlError> {
        let addr = parse_endpoint(endpoint)?;
        to_json(&self.engine.point_info(addr, include_pending))
    }

    /// Close the tunnel to `endpoint`. False when there was none or the
    /// address does not parse.
    pub fn close_tunnel(&self, endpoint: &str) -> bool {
        match parse_endpoint(endpoint) {
            Ok(addr) => self.engine.close_tunnel(addr, false),
            Err(_) => false,
        }
    }

    pub fn set_remote_for_tunnel(&self, endpoint: &str, remote: &str) -> Result<String, ControlError> {
        let remote: SocketAddr = remote.trim().parse().map_err(|_| ControlError::InvalidRemote)?;
        let addr = parse_endpoint(endpoint)?;
        to_json(&self.engine.set_remote_for_tunnel(addr, remote))
    }

    /// Drop every tunnel except those to towers. Returns how many closed.
    pub fn sleep(&self) -> usize {
        let closed = self.engine.close_all_non_primary_tunnels();
        if closed > 0 {
            tracing::info!(tunnels = closed, "Sleep called, closed non tower tunnels");
        }
        closed
    }

    /// Forward a line from the host app into the log.
    pub fn log(&self, message: &str) {
        tracing::info!(target: "vlan_mobile::host", "{message}");
    }
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Ipv4Addr, ControlError> {
    endpoint
        .trim()
        .parse()
        .map_err(|_| ControlError::InvalidEndpoint(endpoint.to_string()))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ControlError> {
    Ok(serde_json::to_string(value)?)
}
