//! Settings persistence and the live settings store

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Settings;
use crate::utils::paths::{ensure_dir, get_config_dir, get_settings_path};

/// Storage area whose change notifications are honored
pub const LOCAL_AREA: &str = "local";

/// One changed key, as pushed by the storage layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

/// Single owned settings snapshot behind an update function.
///
/// Readers always see the latest value; only `replace` and `apply_changes`
/// write.
#[derive(Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { tx: Arc::new(tx) }
    }

    /// Current settings
    pub fn snapshot(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn replace(&self, settings: Settings) {
        self.tx.send_replace(settings);
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Merge the `newValue`s of a change notification into the snapshot.
    ///
    /// Notifications for other areas are ignored, as are unknown keys and
    /// values of the wrong type. Returns whether anything changed.
    pub fn apply_changes(&self, area: &str, changes: &HashMap<String, StorageChange>) -> bool {
        if area != LOCAL_AREA {
            debug!(area, "Ignoring settings change for foreign storage area");
            return false;
        }

        self.tx.send_if_modified(|settings| {
            let before = settings.clone();
            for (key, change) in changes {
                let Some(new_value) = &change.new_value else { continue };
                match merge_key(settings, key, new_value) {
                    Some(merged) => *settings = merged,
                    None => warn!(key, "Ignoring unusable settings change"),
                }
            }
            *settings != before
        })
    }
}

fn merge_key(settings: &Settings, key: &str, value: &Value) -> Option<Settings> {
    let mut object = match serde_json::to_value(settings).ok()? {
        Value::Object(object) => object,
        _ => return None,
    };
    if !object.contains_key(key) {
        return None;
    }
    object.insert(key.to_string(), value.clone());
    serde_json::from_value(Value::Object(object)).ok()
}

/// Describe the difference between two settings as change notifications
pub fn diff_settings(old: &Settings, new: &Settings) -> HashMap<String, StorageChange> {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return HashMap::new();
    };

    new.into_iter()
        .filter(|(key, value)| old.get(key) != Some(value))
        .map(|(key, value)| {
            let change = StorageChange {
                old_value: old.get(&key).cloned(),
                new_value: Some(value),
            };
            (key, change)
        })
        .collect()
}

/// Load settings from file, missing keys fall back to defaults
pub async fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()).await
}

pub async fn load_settings_from(path: &str) -> Result<Settings> {
    if !Path::new(path).exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Save settings to file
pub async fn save_settings(settings: &Settings) -> Result<()> {
    ensure_dir(&get_config_dir()).await?;
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(get_settings_path(), content).await?;
    Ok(())
}

/// Poll the settings file and push edits into `store` as change
/// notifications, forever
pub async fn follow_settings_file(store: SettingsStore, every: Duration) {
    follow_settings_from(&get_settings_path(), store, every).await
}

async fn follow_settings_from(path: &str, store: SettingsStore, every: Duration) {
    let mut last = store.snapshot();
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        match load_settings_from(path).await {
            Ok(current) if current != last => {
                let changes = diff_settings(&last, &current);
                debug!(keys = ?changes.keys().collect::<Vec<_>>(), "Settings file changed");
                store.apply_changes(LOCAL_AREA, &changes);
                last = current;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, path, "Could not read settings"),
        }
    }
}
