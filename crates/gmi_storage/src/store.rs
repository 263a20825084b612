#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    InvalidStoreName(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::InvalidStoreName(name) => write!(f, "invalid store name: {name}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// The durable-store seam: one JSON value per (store, key) pair, strong
/// read-after-write within a single backend instance. There is no
/// conditional write and no locking here; every caller performs
/// read-modify-write over the whole value and the later writer wins.
pub trait CollectionStore: Send {
    fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&mut self, store: &str, key: &str, value: Value) -> Result<(), StorageError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct MemoryCollectionStore {
    blobs: BTreeMap<(String, String), Value>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionStore for MemoryCollectionStore {
    fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .blobs
            .get(&(store.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&mut self, store: &str, key: &str, value: Value) -> Result<(), StorageError> {
        self.blobs
            .insert((store.to_string(), key.to_string()), value);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// File-per-blob backend: `<root>/<store>/<key>.json`. Store and key names
/// come from the fixed collection registry, so path traversal is rejected
/// rather than escaped.
#[derive(Debug, Clone)]
pub struct FileCollectionStore {
    root: PathBuf,
}

impl FileCollectionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, store: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_segment(store)?;
        validate_segment(key)?;
        Ok(self.root.join(store).join(format!("{key}.json")))
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let ok = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidStoreName(segment.to_string()))
    }
}

impl CollectionStore for FileCollectionStore {
    fn get(&self, store: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.blob_path(store, key)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn set(&mut self, store: &str, key: &str, value: Value) -> Result<(), StorageError> {
        let path = self.blob_path(store, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&value)?;
        fs::write(&path, json)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
