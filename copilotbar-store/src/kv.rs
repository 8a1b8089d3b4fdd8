//! Persistent key-value store.
//!
//! The application keeps its durable state (the access token and the usage
//! history) as top-level keys of a single JSON object on disk.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::persistence::{default_data_path, load_json_if_exists, save_json};

/// Well-known keys.
pub mod keys {
    /// The stored GitHub access token.
    pub const GITHUB_TOKEN: &str = "githubToken";
    /// Date to daily-count mapping.
    pub const USAGE_HISTORY: &str = "usageHistory";
}

// ============================================================================
// Trait
// ============================================================================

/// A string-keyed store of JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes a value. Returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

// ============================================================================
// JSON File Store
// ============================================================================

/// Key-value store backed by one JSON file with 0600 permissions.
///
/// The file is read lazily on first access and rewritten atomically on
/// every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<Map<String, Value>>>,
}

impl JsonFileStore {
    /// Opens a store at `path`. The file need not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Opens the store at the default data path.
    pub fn open_default() -> Self {
        Self::open(default_data_path())
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_loaded(&self, slot: &mut Option<Map<String, Value>>) -> Result<(), StoreError> {
        if slot.is_none() {
            let loaded: Map<String, Value> =
                load_json_if_exists(&self.path).await?.unwrap_or_default();
            debug!(path = %self.path.display(), keys = loaded.len(), "Loaded data file");
            *slot = Some(loaded);
        }
        Ok(())
    }

    async fn read<R>(&self, f: impl FnOnce(&Map<String, Value>) -> R) -> Result<R, StoreError> {
        let mut guard = self.cache.lock().await;
        self.ensure_loaded(&mut guard).await?;
        Ok(f(guard.get_or_insert_with(Map::new)))
    }

    /// Applies `f` to a copy of the map. The copy replaces the cache only
    /// once it has been written to disk.
    async fn update<R>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> (R, bool),
    ) -> Result<R, StoreError> {
        let mut guard = self.cache.lock().await;
        self.ensure_loaded(&mut guard).await?;

        let mut next = (*guard).clone().unwrap_or_default();
        let (result, dirty) = f(&mut next);
        if dirty {
            save_json(&self.path, &next).await?;
            *guard = Some(next);
        }
        Ok(result)
    }
}

impl std::fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.read(|map| map.get(key).cloned()).await
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value);
            ((), true)
        })
        .await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.update(|map| {
            let existed = map.remove(key).is_some();
            (existed, existed)
        })
        .await
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// In-memory key-value store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.map.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.map.lock().await.remove(key).is_some())
    }
}

// ============================================================================
// Tests
// ============================================================================
