#![forbid(unsafe_code)]

use gmi_contracts::collection::CollectionKind;
use serde_json::Value;

use crate::store::{CollectionStore, StorageError};

/// Newest-first retention cap on the activity-log collection.
pub const ACTIVITY_LOG_CAP: usize = 1000;

/// Read a collection. Absence is normalized to an empty list, and so is a
/// blob that somehow holds a non-array value; GET never fails on shape.
pub fn list(
    store: &dyn CollectionStore,
    kind: CollectionKind,
) -> Result<Vec<Value>, StorageError> {
    let value = store.get(kind.store_name(), kind.blob_key())?;
    Ok(match value {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    })
}

/// Replace-style write: the entire collection becomes exactly `records`.
/// No merge with prior contents; two racing replace calls lose the
/// earlier writer's array by design.
pub fn replace(
    store: &mut dyn CollectionStore,
    kind: CollectionKind,
    records: Vec<Value>,
) -> Result<usize, StorageError> {
    let count = records.len();
    store.set(kind.store_name(), kind.blob_key(), Value::Array(records))?;
    Ok(count)
}

/// Prepend one record and keep the newest `cap` entries. Eviction is from
/// the back: index 0 is always the record just written.
pub fn prepend_capped(
    store: &mut dyn CollectionStore,
    kind: CollectionKind,
    record: Value,
    cap: usize,
) -> Result<usize, StorageError> {
    let mut records = list(store, kind)?;
    records.insert(0, record);
    records.truncate(cap);
    replace(store, kind, records)
}

/// Remove every record whose `id` field equals `id` and write the rest
/// back. Deleting an id that is not present rewrites the collection
/// unchanged and still succeeds. Returns how many records were removed.
pub fn delete_by_id(
    store: &mut dyn CollectionStore,
    kind: CollectionKind,
    id: &Value,
) -> Result<usize, StorageError> {
    let records = list(store, kind)?;
    let before = records.len();
    let kept: Vec<Value> = records
        .into_iter()
        .filter(|record| record.get("id") != Some(id))
        .collect();
    let removed = before - kept.len();
    replace(store, kind, kept)?;
    Ok(removed)
}
