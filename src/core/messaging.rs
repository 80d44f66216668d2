//! Request/response port between the page and the privileged background
//!
//! The page never talks to resolver backends itself: it sends `resolveUrl`
//! and `openTab` messages, and the background owns the resolver and cache.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::core::resolver::{ResolveResults, UrlResolver};
use crate::error::{Result, WatchOnLbryError};
use crate::storage::config::SettingsStore;
use crate::types::ResolveRequest;

/// Prefix of a reply that reports a background failure
pub const ERROR_PREFIX: &str = "error:";

/// Wire message: `{ "method": "...", "data": "<json string>" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "data", rename_all = "camelCase")]
pub enum Message {
    ResolveUrl(String),
    OpenTab(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenTabRequest {
    pub href: String,
}

impl Message {
    pub fn resolve_url(requests: &[ResolveRequest]) -> Result<Self> {
        Ok(Message::ResolveUrl(serde_json::to_string(requests)?))
    }

    pub fn open_tab(href: &str) -> Result<Self> {
        Ok(Message::OpenTab(serde_json::to_string(&OpenTabRequest {
            href: href.to_string(),
        })?))
    }
}

/// Send a message, maybe get a string reply
#[async_trait]
pub trait MessagePort: Send + Sync {
    async fn send(&self, message: Message) -> Option<String>;
}

/// Something that can open a browser tab
pub trait TabOpener: Send + Sync {
    fn open_tab(&self, href: &str);
}

/// Ask the background to resolve ids.
///
/// A reply starting with `error:` becomes an error; no reply means no
/// results.
pub async fn request_resolve_by_id(
    port: &dyn MessagePort,
    requests: &[ResolveRequest],
) -> Result<ResolveResults> {
    let response = port.send(Message::resolve_url(requests)?).await;
    match response {
        Some(reply) if reply.starts_with(ERROR_PREFIX) => {
            error!(?requests, "Background error");
            Err(WatchOnLbryError::Background(reply))
        }
        Some(reply) => Ok(serde_json::from_str(&reply)?),
        None => Ok(HashMap::new()),
    }
}

/// Ask the background to open a tab; no reply is expected
pub async fn request_open_tab(port: &dyn MessagePort, href: &str) -> Result<()> {
    port.send(Message::open_tab(href)?).await;
    Ok(())
}

/// Privileged side: owns the resolver and answers page messages
pub struct Background {
    resolver: UrlResolver,
    settings: SettingsStore,
    tabs: Arc<dyn TabOpener>,
}

impl Background {
    pub fn new(resolver: UrlResolver, settings: SettingsStore, tabs: Arc<dyn TabOpener>) -> Self {
        Self {
            resolver,
            settings,
            tabs,
        }
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    pub async fn handle(&self, message: Message) -> Option<String> {
        match message {
            Message::ResolveUrl(data) => Some(match self.resolve_url(&data).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "resolveUrl failed");
                    format!("{}{}", ERROR_PREFIX, e)
                }
            }),
            Message::OpenTab(data) => {
                match serde_json::from_str::<OpenTabRequest>(&data) {
                    Ok(request) => self.tabs.open_tab(&request.href),
                    Err(e) => warn!(error = %e, "Ignoring malformed openTab message"),
                }
                None
            }
        }
    }

    async fn resolve_url(&self, data: &str) -> Result<String> {
        let requests: Vec<ResolveRequest> = serde_json::from_str(data)
            .map_err(|e| WatchOnLbryError::InvalidMessage(format!("resolveUrl data: {}", e)))?;
        let resolver = self.settings.snapshot().url_resolver;
        let results = self.resolver.resolve(resolver, &requests).await?;
        Ok(serde_json::to_string(&results)?)
    }
}

/// Port that hands messages straight to an in-process background
#[derive(Clone)]
pub struct LocalPort {
    background: Arc<Background>,
}

impl LocalPort {
    pub fn new(background: Arc<Background>) -> Self {
        Self { background }
    }
}

#[async_trait]
impl MessagePort for LocalPort {
    async fn send(&self, message: Message) -> Option<String> {
        self.background.handle(message).await
    }
}
