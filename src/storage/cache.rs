//! Persisted resolver cache
//!
//! Entries never expire; the timestamp only records when the snapshot was
//! written.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::core::url_cache::{CacheKey, ResolutionCache};
use crate::error::Result;
use crate::types::LbryClaim;
use crate::utils::paths::{ensure_dir, get_cache_dir, get_resolver_cache_path};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    #[serde(flatten)]
    key: CacheKey,
    claim: Option<LbryClaim>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    /// Unix timestamp of the save
    saved_at: i64,
    entries: Vec<PersistedEntry>,
}

/// Fill `cache` from the snapshot on disk, returns how many entries loaded
pub async fn load_into(cache: &ResolutionCache) -> Result<usize> {
    load_from(cache, &get_resolver_cache_path()).await
}

async fn load_from(cache: &ResolutionCache, path: &str) -> Result<usize> {
    if !Path::new(path).exists() {
        return Ok(0);
    }

    let content = fs::read_to_string(path).await?;
    let file: CacheFile = match serde_json::from_str(&content) {
        Ok(file) => file,
        Err(e) => {
            // A corrupt snapshot is just an empty cache
            warn!(error = %e, path, "Discarding unreadable resolver cache");
            return Ok(0);
        }
    };

    let count = file.entries.len();
    cache.restore(file.entries.into_iter().map(|e| (e.key, e.claim)));
    debug!(count, saved_at = file.saved_at, "Restored resolver cache");
    Ok(count)
}

/// Write every definitive entry to disk
pub async fn save(cache: &ResolutionCache) -> Result<()> {
    ensure_dir(&get_cache_dir()).await?;
    save_to(cache, &get_resolver_cache_path()).await
}

async fn save_to(cache: &ResolutionCache, path: &str) -> Result<()> {
    let file = CacheFile {
        saved_at: Utc::now().timestamp(),
        entries: cache
            .snapshot()
            .into_iter()
            .map(|(key, claim)| PersistedEntry { key, claim })
            .collect(),
    };

    let content = serde_json::to_string(&file)?;
    fs::write(path, content).await?;
    Ok(())
}

/// Clear memory and the snapshot on disk
pub async fn clear_all(cache: &ResolutionCache) -> Result<()> {
    cache.clear_all();
    let path = get_resolver_cache_path();
    if Path::new(&path).exists() {
        fs::remove_file(&path).await?;
    }
    Ok(())
}
