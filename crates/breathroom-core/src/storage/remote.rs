//! Remote history store -- post finished sessions to an HTTP endpoint.

use std::time::Duration;

use reqwest::Client;

use super::config::RemoteConfig;
use crate::error::{CoreError, Result};
use crate::sinks::HistoryEntry;

#[derive(Debug, Clone)]
pub struct RemoteHistory {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteHistory {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// `None` when no endpoint is configured.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>> {
        match config.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Self::new(
                endpoint,
                config.api_key.clone(),
                Duration::from_secs(config.timeout_secs.max(1)),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `entry` as JSON.
    ///
    /// # Errors
    /// Network failures, timeouts and non-2xx responses.
    pub async fn submit(&self, entry: &HistoryEntry) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(entry);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            tracing::debug!(endpoint = %self.endpoint, "remote history saved");
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(CoreError::Remote {
                message: format!("HTTP {status}: {text}"),
                source: None,
            })
        }
    }

    /// Submit on the current tokio runtime without waiting for the result.
    /// Failures are only logged.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_detached(&self, entry: HistoryEntry) -> tokio::task::JoinHandle<()> {
        let remote = self.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.submit(&entry).await {
                tracing::warn!(endpoint = %remote.endpoint, error = %e, "remote history save failed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_without_endpoint_is_none() {
        assert!(RemoteHistory::from_config(&RemoteConfig::default())
            .unwrap()
            .is_none());

        let blank = RemoteConfig {
            endpoint: Some("  ".into()),
            ..RemoteConfig::default()
        };
        assert!(RemoteHistory::from_config(&blank).unwrap().is_none());
    }

    #[test]
    fn from_config_with_endpoint() {
        let cfg = RemoteConfig {
            endpoint: Some("http://localhost:9/history".into()),
            api_key: Some(String::new()),
            timeout_secs: 2,
        };
        let remote = RemoteHistory::from_config(&cfg).unwrap().unwrap();
        assert_eq!(remote.endpoint(), "http://localhost:9/history");
        assert!(remote.api_key.is_none());
    }
}
