//! Single-cycle sync checks against the live settings.

use std::sync::Arc;
use url::Url;

use crate::config::{
    parse_settings, validate_settings, ConfigError, ConfigStore, ConfigWriter, SettingsTree,
};
use crate::observability::metrics;
use crate::sync::fetch::Fetcher;
use crate::sync::source::{resolve_addition, resolve_source, DEFAULT_SOURCE_TEMPLATE};
use crate::sync::{CheckOutcome, CheckReport, SyncError};

/// Both reports from one [`SyncAgent::run_cycle`].
#[derive(Debug)]
pub struct CycleReport {
    pub primary: CheckReport,
    pub addition: CheckReport,
}

/// Pulls remote settings into a [`ConfigStore`].
///
/// The agent only knows how to run one cycle; scheduling belongs to
/// [`SyncTask`](crate::sync::SyncTask) or the host.
pub struct SyncAgent {
    store: Arc<ConfigStore>,
    fetcher: Arc<dyn Fetcher>,
    source_template: String,
}

impl SyncAgent {
    pub fn new(store: Arc<ConfigStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            source_template: DEFAULT_SOURCE_TEMPLATE.to_string(),
        }
    }

    /// Override where bare source identifiers resolve to. `{id}` is replaced.
    pub fn with_source_template(mut self, template: impl Into<String>) -> Self {
        self.source_template = template.into();
        self
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Run the primary and addition checks concurrently.
    pub async fn run_cycle(&self) -> CycleReport {
        let (primary, addition) = tokio::join!(self.check_primary(), self.check_addition());
        CycleReport { primary, addition }
    }

    /// Fetch `sync.source` and adopt it when it carries a CA.
    pub async fn check_primary(&self) -> CheckReport {
        let report = self.primary().await;
        metrics::record_sync_check("primary", report.outcome.label());
        report
    }

    /// Fetch `sync.addition` and merge it into the live settings.
    pub async fn check_addition(&self) -> CheckReport {
        let report = self.addition().await;
        metrics::record_sync_check("addition", report.outcome.label());
        report
    }

    async fn primary(&self) -> CheckReport {
        let Some(source) = self.configured("sync.source") else {
            tracing::debug!("No sync source configured");
            return CheckReport::without_reload(CheckOutcome::Skipped);
        };
        let url = match resolve_source(&source, &self.source_template) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(source = %source, error = %err, "Sync source skipped");
                return CheckReport::without_reload(CheckOutcome::Rejected(err));
            }
        };

        let fetched = match self.fetch_body(&url).await {
            Ok(body) => parse_settings(&body).map_err(|err| SyncError::Parse(err.to_string())),
            Err(err) => Err(err),
        };

        let mut writer = self.store.lock().await;
        let outcome = match fetched {
            Ok(settings) if settings.has_text("pki.ca") => adopt(&mut writer, settings),
            Ok(_) => {
                tracing::info!(url = %url, "Fetched settings carry no CA, keeping current settings");
                CheckOutcome::Applied {
                    adopted: false,
                    persisted: false,
                }
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "Sync source check failed");
                CheckOutcome::Failed(err)
            }
        };
        finish(writer, outcome).await
    }

    async fn addition(&self) -> CheckReport {
        let Some(addition) = self.configured("sync.addition") else {
            tracing::debug!("No sync addition configured");
            return CheckReport::without_reload(CheckOutcome::Skipped);
        };
        let url = match resolve_addition(&addition) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(addition = %addition, error = %err, "Sync addition skipped");
                return CheckReport::without_reload(CheckOutcome::Rejected(err));
            }
        };

        let fetched = match self.fetch_body(&url).await {
            Ok(body) => parse_overlay(&body),
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "Sync addition check failed");
                Err(err)
            }
        };

        let mut writer = self.store.lock().await;
        let outcome = match fetched {
            Ok(overlay) => merge_overlay(&mut writer, overlay),
            Err(err) => CheckOutcome::Failed(err),
        };
        finish(writer, outcome).await
    }

    fn configured(&self, key: &str) -> Option<String> {
        self.store
            .snapshot()
            .get_str(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    async fn fetch_body(&self, url: &Url) -> Result<String, SyncError> {
        let response = self.fetcher.get(url).await?;
        if !response.is_usable() {
            return Err(SyncError::Fetch(format!(
                "status {} with {} byte body",
                response.status,
                response.body.len()
            )));
        }
        tracing::debug!(url = %url, bytes = response.body.len(), "Fetched settings");
        Ok(response.body)
    }
}

impl std::fmt::Debug for SyncAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncAgent")
            .field("store", &self.store)
            .field("source_template", &self.source_template)
            .finish_non_exhaustive()
    }
}

/// Markup first, then JSON. When both fail the JSON error is kept.
fn parse_overlay(body: &str) -> Result<SettingsTree, SyncError> {
    if let Ok(tree) = SettingsTree::from_markup(body) {
        return Ok(tree);
    }
    SettingsTree::from_json(body).map_err(|err| {
        tracing::debug!(error = %err, "Sync addition is neither markup nor JSON");
        SyncError::Parse(err.to_string())
    })
}

/// Replace the live settings with `settings` and persist them.
///
/// A failed write restores the previous settings.
fn adopt(writer: &mut ConfigWriter<'_>, settings: SettingsTree) -> CheckOutcome {
    let previous = writer.settings();
    writer.replace(settings);
    match writer.persist() {
        Ok(persisted) => {
            tracing::info!(persisted, "Adopted settings from sync source");
            CheckOutcome::Applied {
                adopted: true,
                persisted,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Could not persist synced settings");
            writer.replace(SettingsTree::clone(&previous));
            CheckOutcome::Failed(err.into())
        }
    }
}

/// Merge `overlay` into the live settings, persisting when a CA is present.
///
/// A merged tree that fails validation or a failed write restores the
/// previous settings.
fn merge_overlay(writer: &mut ConfigWriter<'_>, overlay: SettingsTree) -> CheckOutcome {
    let previous = writer.settings();
    writer.merge(overlay);
    if let Err(errors) = validate_settings(&writer.settings()) {
        let err = ConfigError::Validation(errors);
        tracing::warn!(error = %err, "Merged sync addition is invalid, keeping current settings");
        writer.replace(SettingsTree::clone(&previous));
        return CheckOutcome::Failed(SyncError::Parse(err.to_string()));
    }
    if !writer.settings().has_text("pki.ca") {
        tracing::info!("Merged sync addition");
        return CheckOutcome::Applied {
            adopted: true,
            persisted: false,
        };
    }
    match writer.persist() {
        Ok(persisted) => {
            tracing::info!(persisted, "Merged sync addition");
            CheckOutcome::Applied {
                adopted: true,
                persisted,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Could not persist merged settings");
            writer.replace(SettingsTree::clone(&previous));
            CheckOutcome::Failed(err.into())
        }
    }
}

/// Reload while still holding the writer, so the reload sees what was saved.
async fn finish(writer: ConfigWriter<'_>, outcome: CheckOutcome) -> CheckReport {
    let reload = writer.reload().await;
    if let Err(err) = &reload {
        tracing::warn!(error = %err, "Reload after sync check failed");
    }
    CheckReport {
        outcome,
        reload: Some(reload),
    }
}
