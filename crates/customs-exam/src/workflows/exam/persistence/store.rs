use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

/// Schemaless document as accepted by the hosted store.
pub type Document = Map<String, Value>;

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored document {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Keyed document store shared by every exam flow.
///
/// `merge` overwrites the top-level fields present in the incoming document
/// and keeps the ones it omits. There is no optimistic concurrency check, so
/// concurrent writers resolve as last-write-wins.
pub trait DocumentStore: Send + Sync {
    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;
    fn merge(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError>;
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;
}

fn merge_into(collections: &mut Collections, collection: &str, key: &str, document: Document) {
    let target = collections
        .entry(collection.to_string())
        .or_default()
        .entry(key.to_string())
        .or_default();
    for (field, value) in document {
        target.insert(field, value);
    }
}

fn lock_error<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("store mutex poisoned".to_string())
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.lock().map_err(lock_error)?;
        Ok(guard
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    fn merge(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().map_err(lock_error)?;
        merge_into(&mut guard, collection, key, document);
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.lock().map_err(lock_error)?;
        Ok(guard
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Whole-file JSON store. Every merge rewrites the file through a temporary
/// sibling and a rename so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct JsonFileDocumentStore {
    path: PathBuf,
    collections: Mutex<Collections>,
}

impl JsonFileDocumentStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let collections = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Collections::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Collections::new()
        };

        tracing::debug!(path = %path.display(), collections = collections.len(), "json store opened");
        Ok(Self {
            path,
            collections: Mutex::new(collections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(collections)?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl DocumentStore for JsonFileDocumentStore {
    fn fetch(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.lock().map_err(lock_error)?;
        Ok(guard
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    fn merge(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError> {
        let mut guard = self.collections.lock().map_err(lock_error)?;
        let mut next = guard.clone();
        merge_into(&mut next, collection, key, document);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.lock().map_err(lock_error)?;
        Ok(guard
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }
}
