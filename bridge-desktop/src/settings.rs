//! Settings Storage backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

const SETTINGS_FILE: &str = "settings.json";

/// JSON-file settings store
///
/// Keeps every key in memory and rewrites the whole file on each change.
/// The file is a flat JSON object of string values, written to a sibling
/// temp file first and then renamed into place.
pub struct JsonSettingsStore {
    path: Option<PathBuf>,
    values: RwLock<BTreeMap<String, String>>,
}

impl JsonSettingsStore {
    /// Open (or create) a settings file at `path`.
    ///
    /// A file that cannot be parsed is treated as empty and overwritten on
    /// the next write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(raw) => Self::decode(&path, &raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, keys = values.len(), "Initialized settings store");

        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    /// Synchronous variant of [`Self::open`] for construction outside a
    /// runtime (e.g. while building configuration).
    pub fn open_blocking(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(BridgeError::Io)?;
        }

        let values = match std::fs::read(&path) {
            Ok(raw) => Self::decode(&path, &raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    /// Open the store under the platform config directory
    /// (`<config_dir>/<app_name>/settings.json`).
    pub async fn open_default(app_name: &str) -> Result<Self> {
        Self::open(Self::default_path(app_name)?).await
    }

    /// Default settings file location for `app_name`.
    pub fn default_path(app_name: &str) -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            BridgeError::NotAvailable("No config directory on this platform".to_string())
        })?;
        Ok(base.join(app_name).join(SETTINGS_FILE))
    }

    fn decode(path: &Path, raw: &[u8]) -> BTreeMap<String, String> {
        serde_json::from_slice(raw).unwrap_or_else(|e| {
            warn!(path = ?path, error = %e, "Settings file is corrupt, starting empty");
            BTreeMap::new()
        })
    }

    /// Create an in-memory settings store (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: RwLock::new(BTreeMap::new()),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let encoded = serde_json::to_vec_pretty(values).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode settings: {}", e))
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .map_err(BridgeError::Io)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(BridgeError::Io)?;

        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values).await?;

        debug!(key = key, "Stored setting");
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().await;
        if values.remove(key).is_some() {
            self.persist(&values).await?;
            debug!(key = key, "Deleted setting");
        }
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.read().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut values = self.values.write().await;
        values.clear();
        self.persist(&values).await?;

        debug!("Cleared all settings");
        Ok(())
    }
}
