#![forbid(unsafe_code)]

pub mod ops;
pub mod store;

pub use ops::{delete_by_id, list, prepend_capped, replace, ACTIVITY_LOG_CAP};
pub use store::{CollectionStore, FileCollectionStore, MemoryCollectionStore, StorageError};
