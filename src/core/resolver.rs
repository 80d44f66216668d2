//! Target resolver: cache first, then batched lookups against a backend

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::descriptor::ResolverRegistry;
use crate::core::request::build_requests;
use crate::core::response_path::{extract, zip_results};
use crate::core::transport::ResolveTransport;
use crate::core::url_cache::{CacheKey, ResolutionCache, Ticket};
use crate::error::{Result, WatchOnLbryError};
use crate::types::{LbryClaim, ResolveRequest, ResolveType, ResolverName};

/// Resolution results keyed by source id; `None` = confirmed no mapping
pub type ResolveResults = HashMap<String, Option<LbryClaim>>;

pub struct UrlResolver {
    registry: ResolverRegistry,
    cache: ResolutionCache,
    transport: Arc<dyn ResolveTransport>,
}

impl UrlResolver {
    pub fn new(
        registry: ResolverRegistry,
        cache: ResolutionCache,
        transport: Arc<dyn ResolveTransport>,
    ) -> Self {
        Self {
            registry,
            cache,
            transport,
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve a batch of ids with the named backend.
    ///
    /// Every answer, positive or negative, is cached. A transport failure
    /// fails the whole call and leaves the cache untouched for the keys it
    /// was fetching.
    pub async fn resolve(
        &self,
        resolver: ResolverName,
        requests: &[ResolveRequest],
    ) -> Result<ResolveResults> {
        let descriptor = self.registry.get(resolver)?;
        let keys = requests
            .iter()
            .map(|r| CacheKey::new(resolver, r.kind, r.id.clone()));
        let reservation = self.cache.reserve(keys);

        let mut results: ResolveResults = reservation
            .hits
            .into_iter()
            .map(|(key, claim)| (key.id, claim))
            .collect();

        let mut by_kind: HashMap<ResolveType, Vec<Ticket>> = HashMap::new();
        for ticket in reservation.owned {
            by_kind.entry(ticket.key.kind).or_default().push(ticket);
        }

        for (kind, tickets) in by_kind {
            let function = descriptor.functions.for_kind(kind);
            let mut tickets: HashMap<String, Ticket> = tickets
                .into_iter()
                .map(|t| (t.key.id.clone(), t))
                .collect();
            let ids: Vec<String> = tickets.keys().cloned().collect();

            for call in build_requests(descriptor, function, &ids)? {
                let response = match self.transport.get_json(&call.url).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(url = %call.url, error = %e, "Resolve request failed");
                        let message = e.to_string();
                        for ticket in tickets.into_values() {
                            ticket.fail(&message);
                        }
                        return Err(match e {
                            e if e.is_transport() => e,
                            other => WatchOnLbryError::Transport(other.to_string()),
                        });
                    }
                };

                let zipped = match extract(&response, &function.response_path, &call.ids) {
                    Ok(extracted) => zip_results(&call.ids, &extracted),
                    Err(e) => {
                        debug!(url = %call.url, error = %e, "Unexpected response shape, treating as unresolved");
                        call.ids.iter().map(|id| (id.clone(), None)).collect()
                    }
                };

                for (id, pathname) in zipped {
                    let claim = pathname.map(|id| LbryClaim { id, kind });
                    if let Some(ticket) = tickets.remove(&id) {
                        ticket.complete(claim.clone());
                    }
                    results.insert(id, claim);
                }
            }
        }

        for pending in reservation.waiting {
            let (key, claim) = pending.wait().await?;
            results.insert(key.id, claim);
        }

        debug!(
            requested = requests.len(),
            resolved = results.values().filter(|c| c.is_some()).count(),
            "Resolve finished"
        );
        Ok(results)
    }
}
