//! Endpoint discovery
//!
//! A session resolves its endpoint once before the first connect. Failures
//! are reported to the UI and never retried automatically.

use async_trait::async_trait;

use crate::config::Endpoint;
use crate::error::DiscoveryError;

/// Resolves the endpoint a session connects to
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve(&self) -> Result<Endpoint, DiscoveryError>;
}

/// Discovery that always returns the configured endpoint
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    endpoint: Endpoint,
}

impl StaticDiscovery {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn resolve(&self) -> Result<Endpoint, DiscoveryError> {
        Ok(self.endpoint.clone())
    }
}

/// Asks an HTTP matchmaker for a game server
///
/// The matchmaker answers `GET <url>` with `{"host": ..., "port": ...}` and
/// an optional `secure` flag.
#[derive(Debug, Clone)]
pub struct MatchmakerDiscovery {
    url: String,
    client: reqwest::Client,
}

impl MatchmakerDiscovery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Discovery for MatchmakerDiscovery {
    async fn resolve(&self) -> Result<Endpoint, DiscoveryError> {
        tracing::info!(url = %self.url, "Requesting endpoint from matchmaker");

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status(status.as_u16()));
        }

        let endpoint: Endpoint = response
            .json()
            .await
            .map_err(|e| DiscoveryError::InvalidResponse(e.to_string()))?;

        if endpoint.host.is_empty() || endpoint.port == 0 {
            return Err(DiscoveryError::InvalidResponse(format!(
                "unusable endpoint {}:{}",
                endpoint.host, endpoint.port
            )));
        }

        tracing::info!(endpoint = %endpoint.url(), "Matchmaker assigned endpoint");
        Ok(endpoint)
    }
}
