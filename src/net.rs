use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, TelemetryError};
use crate::types::{FeedAlert, HistoryWindow, Reading, RemoteThresholds};

/// Where readings, history and feed alerts come from.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Reading>;

    /// Delivered newest-first by the garden backend.
    async fn fetch_history(&self) -> Result<HistoryWindow>;

    async fn fetch_alerts(&self) -> Result<Vec<FeedAlert>>;

    async fn fetch_thresholds(&self) -> Result<RemoteThresholds>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    backend_url: String,
    latest_path: String,
    history_path: String,
    alerts_path: String,
    settings_path: String,
}

impl HttpSource {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(HttpSource {
            client,
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            latest_path: config.latest_path.clone(),
            history_path: config.history_path.clone(),
            alerts_path: config.alerts_path.clone(),
            settings_path: config.settings_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.backend_url, path)
        } else {
            format!("{}/{}", self.backend_url, path)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await?.error_for_status()?;

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Err(TelemetryError::MalformedResponse(format!("empty body from {}", url)));
        }
        debug!(url = %url, bytes = text.len(), "Fetched");
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl TelemetrySource for HttpSource {
    async fn fetch_latest(&self) -> Result<Reading> {
        self.get_json(&self.latest_path).await
    }

    async fn fetch_history(&self) -> Result<HistoryWindow> {
        self.get_json(&self.history_path).await
    }

    async fn fetch_alerts(&self) -> Result<Vec<FeedAlert>> {
        self.get_json(&self.alerts_path).await
    }

    async fn fetch_thresholds(&self) -> Result<RemoteThresholds> {
        self.get_json(&self.settings_path).await
    }
}
