//! Credential store: cookie value → `PwIdCombo` records.
//!
//! The core only needs point lookup and delete by key, both of which may
//! fail with `NotFound`. `put` is used by the login flow.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Session credential stored under the full cookie value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwIdCombo {
    #[serde(rename = "CalleeId")]
    pub callee_id: String,
    #[serde(rename = "Pw")]
    pub pw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("key not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("store backend failed: {0}")]
    Backend(String),
}

impl StoreError {
    fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

/// Key-value contract the session resolver authenticates against.
pub trait CredentialStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<PwIdCombo, StoreError>;

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    fn put(&self, bucket: &str, key: &str, record: PwIdCombo) -> Result<(), StoreError>;
}

type Records = DashMap<(String, String), PwIdCombo>;

/// In-memory store. Cloning shares the records.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    records: Arc<Records>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, bucket: &str, key: &str) -> Result<PwIdCombo, StoreError> {
        self.records
            .get(&(bucket.to_string(), key.to_string()))
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.records
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    fn put(&self, bucket: &str, key: &str, record: PwIdCombo) -> Result<(), StoreError> {
        self.records
            .insert((bucket.to_string(), key.to_string()), record);
        Ok(())
    }
}

/// Store persisted as JSON on every mutation and reloaded on startup.
///
/// File layout: `{ bucket: { key: PwIdCombo } }`.
pub struct FileCredentialStore {
    records: Arc<Records>,
    path: PathBuf,
}

impl FileCredentialStore {
    /// Open `path`, loading existing records if the file exists.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let store = Self {
            records: Arc::new(DashMap::new()),
            path,
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn load_from_disk(&self) -> Result<(), StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::Backend(format!("{}: {e}", self.path.display()))),
        };
        let buckets: HashMap<String, HashMap<String, PwIdCombo>> = serde_json::from_str(&text)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", self.path.display())))?;
        let mut loaded = 0usize;
        for (bucket, entries) in buckets {
            for (key, record) in entries {
                self.records.insert((bucket.clone(), key), record);
                loaded += 1;
            }
        }
        tracing::info!(count = loaded, path = %self.path.display(), "loaded credential records");
        Ok(())
    }

    fn save_to_disk(&self) -> Result<(), StoreError> {
        let mut buckets: HashMap<String, HashMap<String, PwIdCombo>> = HashMap::new();
        for entry in self.records.iter() {
            let (bucket, key) = entry.key();
            buckets
                .entry(bucket.clone())
                .or_default()
                .insert(key.clone(), entry.value().clone());
        }
        let json = serde_json::to_string_pretty(&buckets)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        std::fs::write(&self.path, json).map_err(|e| {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to persist credentials");
            StoreError::Backend(e.to_string())
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, bucket: &str, key: &str) -> Result<PwIdCombo, StoreError> {
        self.records
            .get(&(bucket.to_string(), key.to_string()))
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.records
            .remove(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| StoreError::not_found(bucket, key))?;
        self.save_to_disk()
    }

    fn put(&self, bucket: &str, key: &str, record: PwIdCombo) -> Result<(), StoreError> {
        self.records
            .insert((bucket.to_string(), key.to_string()), record);
        self.save_to_disk()
    }
}
