//! Path utilities for watch-on-lbry
//!
//! Respects XDG Base Directory Specification

use crate::error::Result;
use std::env;
use tokio::fs;

const APP_NAME: &str = "watch-on-lbry";

/// Get config directory path
/// Respects XDG_CONFIG_HOME, defaults to ~/.config/watch-on-lbry
pub fn get_config_dir() -> String {
    let base = env::var("XDG_CONFIG_HOME")
        .unwrap_or_else(|_| {
            dirs::config_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("{}/.config", env::var("HOME").unwrap_or_default()))
        });

    format!("{}/{}", base, APP_NAME)
}

/// Get cache directory path
/// Respects XDG_CACHE_HOME, defaults to ~/.cache/watch-on-lbry
pub fn get_cache_dir() -> String {
    let base = env::var("XDG_CACHE_HOME")
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("{}/.cache", env::var("HOME").unwrap_or_default()))
        });

    format!("{}/{}", base, APP_NAME)
}

/// Get settings file path
pub fn get_settings_path() -> String {
    format!("{}/settings.json", get_config_dir())
}

/// Get persisted resolver cache path
pub fn get_resolver_cache_path() -> String {
    format!("{}/resolver-cache.json", get_cache_dir())
}

/// Ensure a directory exists
pub async fn ensure_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    Ok(())
}

/// Ensure all required app directories exist
pub async fn ensure_app_dirs() -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    ensure_dir(&get_cache_dir()).await?;
    Ok(())
}
