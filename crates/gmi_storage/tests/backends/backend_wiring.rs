#![forbid(unsafe_code)]

use gmi_contracts::collection::CollectionKind;
use gmi_storage::{list, replace, CollectionStore, FileCollectionStore};
use serde_json::json;

#[test]
fn at_backend_01_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let kind = CollectionKind::TobPlans;
    let records = vec![json!({"id": "1", "providerName": "Daman"})];

    {
        let mut store = FileCollectionStore::new(dir.path());
        replace(&mut store, kind, records.clone()).unwrap();
    }

    let reopened = FileCollectionStore::new(dir.path());
    assert_eq!(list(&reopened, kind).unwrap(), records);
}

#[test]
fn at_backend_02_file_store_reads_absent_blob_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileCollectionStore::new(dir.path());
    assert!(list(&store, CollectionKind::Users).unwrap().is_empty());
}

#[test]
fn at_backend_03_stores_are_isolated_from_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileCollectionStore::new(dir.path());

    replace(&mut store, CollectionKind::Comparisons, vec![json!({"id": "c1"})]).unwrap();
    replace(&mut store, CollectionKind::TobTemplates, vec![json!({"id": "t1"})]).unwrap();

    assert_eq!(
        list(&store, CollectionKind::Comparisons).unwrap(),
        vec![json!({"id": "c1"})]
    );
    assert_eq!(
        list(&store, CollectionKind::TobTemplates).unwrap(),
        vec![json!({"id": "t1"})]
    );
}

#[test]
fn at_backend_04_set_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileCollectionStore::new(dir.path());
    let kind = CollectionKind::CustomCompanies;

    store
        .set(kind.store_name(), kind.blob_key(), json!(["first"]))
        .unwrap();
    store
        .set(kind.store_name(), kind.blob_key(), json!(["second"]))
        .unwrap();

    assert_eq!(
        store.get(kind.store_name(), kind.blob_key()).unwrap(),
        Some(json!(["second"]))
    );
}
