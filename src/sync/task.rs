//! Host-owned periodic driver for [`SyncAgent`].

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::duration::parse_duration;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::sync::agent::SyncAgent;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct SyncTask {
    agent: Arc<SyncAgent>,
    interval: Duration,
}

impl SyncTask {
    /// Use `sync.interval` from the live settings, falling back to 15 minutes.
    pub fn new(agent: Arc<SyncAgent>) -> Self {
        let configured = agent.store().snapshot().get_string("sync.interval");
        let interval = match configured.as_deref().map(parse_duration) {
            Some(Ok(interval)) if !interval.is_zero() => interval,
            Some(Ok(_)) | None => DEFAULT_SYNC_INTERVAL,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "Invalid sync.interval, using default");
                DEFAULT_SYNC_INTERVAL
            }
        };
        Self { agent, interval }
    }

    /// Override the interval. Zero keeps the default, `tokio::time::interval` panics on it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            tracing::warn!("Zero sync interval, using default");
            self.interval = DEFAULT_SYNC_INTERVAL;
        } else {
            self.interval = interval;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until `shutdown` fires. The first cycle runs immediately.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(interval = ?self.interval, "Starting sync task");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.agent.run_cycle().await;
                    tracing::debug!(
                        primary = report.primary.outcome.label(),
                        addition = report.addition.outcome.label(),
                        "Sync cycle finished"
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sync task received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: &Shutdown) -> JoinHandle<()> {
        let signal = shutdown.subscribe();
        tokio::spawn(self.run(signal))
    }
}
