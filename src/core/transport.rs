//! Outbound HTTP used by resolvers and the page sampler

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, WatchOnLbryError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// GET a URL and parse the body as JSON
#[async_trait]
pub trait ResolveTransport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<Value>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a page's raw markup with browser-like headers
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WatchOnLbryError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ResolveTransport for HttpTransport {
    async fn get_json(&self, url: &Url) -> Result<Value> {
        debug!(%url, "Resolving");
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WatchOnLbryError::Network(format!(
                "HTTP {}: {}",
                response.status(),
                url
            )));
        }

        Ok(response.json().await?)
    }
}
