//! Tunnel engine seam.
//!
//! # Data Flow
//! ```text
//! host → Control (string endpoints, JSON out)
//!      → Engine (typed addresses)
//!
//! ConfigStore::reload → EngineReloader → Engine::reload_from_text
//! ```
//!
//! The engine itself lives outside this crate. [`Control`] wraps one
//! together with the live settings it runs from.

pub mod control;

pub use control::{Control, ControlError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ReloadError, Reloader};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine rejected configuration: {0}")]
    Rejected(String),
}

/// Tunnel state for one point, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointInfo {
    pub vpn_addr: Ipv4Addr,
    pub local_index: u32,
    pub remote_index: u32,
    pub remote_addrs: Vec<SocketAddr>,
    pub current_remote: Option<SocketAddr>,
    pub cached_packets: usize,
    pub message_counter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_name: Option<String>,
}

/// Operations a running tunnel engine exposes to its host.
pub trait Engine: Send + Sync {
    fn start(&self);

    fn stop(&self);

    /// Block until the engine has fully stopped.
    fn shutdown_block(&self);

    /// Rebind the UDP listener and refresh towers.
    fn rebind(&self);

    fn reload_from_text(&self, markup: &str) -> Result<(), EngineError>;

    fn list_points(&self, include_pending: bool) -> Vec<PointInfo>;

    fn point_info(&self, vpn_addr: Ipv4Addr, include_pending: bool) -> Option<PointInfo>;

    fn close_tunnel(&self, vpn_addr: Ipv4Addr, local_only: bool) -> bool;

    fn set_remote_for_tunnel(&self, vpn_addr: Ipv4Addr, remote: SocketAddr) -> Option<PointInfo>;

    /// Close every tunnel that does not lead to a tower. Returns how many closed.
    fn close_all_non_primary_tunnels(&self) -> usize;
}

/// Feeds store reloads into an engine.
pub struct EngineReloader {
    engine: Arc<dyn Engine>,
}

impl EngineReloader {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Reloader for EngineReloader {
    async fn reload(&self, markup: &str) -> Result<(), ReloadError> {
        self.engine
            .reload_from_text(markup)
            .map_err(|EngineError::Rejected(reason)| ReloadError::Rejected(reason))
    }
}
