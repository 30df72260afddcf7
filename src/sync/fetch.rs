//! HTTP collaborator used by the sync agent.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::sync::SyncError;

/// Status and body of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// Only a 200 with a non-empty body counts as a document.
    pub fn is_usable(&self) -> bool {
        self.status == 200 && !self.body.is_empty()
    }
}

/// Plain GET of a settings document.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<FetchResponse, SyncError>;
}

/// `reqwest`-backed fetcher with connect and request timeouts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!("vlan-mobile/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SyncError::Fetch(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, SyncError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| SyncError::Fetch(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| SyncError::Fetch(err.to_string()))?;
        Ok(FetchResponse { status, body })
    }
}
