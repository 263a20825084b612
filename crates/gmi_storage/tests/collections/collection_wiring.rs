#![forbid(unsafe_code)]

use gmi_contracts::collection::CollectionKind;
use gmi_storage::{
    delete_by_id, list, prepend_capped, replace, CollectionStore, MemoryCollectionStore,
    ACTIVITY_LOG_CAP,
};
use serde_json::{json, Value};

fn record(id: u64) -> Value {
    json!({"id": id.to_string(), "details": format!("entry_{id}")})
}

#[test]
fn at_ops_01_list_on_absent_key_is_empty() {
    let store = MemoryCollectionStore::new();
    for kind in CollectionKind::ALL {
        assert_eq!(list(&store, kind).unwrap(), Vec::<Value>::new());
    }
}

#[test]
fn at_ops_02_replace_round_trips_any_array_including_empty() {
    let mut store = MemoryCollectionStore::new();

    let records = vec![
        json!({"id": "1", "companyName": "Acme", "customFields": [{"label": "Broker", "value": "NSIB"}]}),
        json!({"id": 2, "nested": {"deep": [1, 2, 3]}}),
    ];
    let count = replace(&mut store, CollectionKind::Comparisons, records.clone()).unwrap();
    assert_eq!(count, 2);
    assert_eq!(list(&store, CollectionKind::Comparisons).unwrap(), records);

    let count = replace(&mut store, CollectionKind::Comparisons, Vec::new()).unwrap();
    assert_eq!(count, 0);
    assert_eq!(
        list(&store, CollectionKind::Comparisons).unwrap(),
        Vec::<Value>::new()
    );
}

#[test]
fn at_ops_03_non_array_blob_normalizes_to_empty_on_read() {
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::CustomCompanies;
    store
        .set(kind.store_name(), kind.blob_key(), json!({"corrupt": true}))
        .unwrap();
    assert_eq!(list(&store, kind).unwrap(), Vec::<Value>::new());
}

#[test]
fn at_ops_04_prepend_puts_new_record_first() {
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::ActivityLogs;
    replace(&mut store, kind, vec![record(1), record(2)]).unwrap();

    let count = prepend_capped(&mut store, kind, record(3), ACTIVITY_LOG_CAP).unwrap();
    assert_eq!(count, 3);

    let logs = list(&store, kind).unwrap();
    assert_eq!(logs[0], record(3));
    assert_eq!(logs[1], record(1));
    assert_eq!(logs[2], record(2));
}

#[test]
fn at_ops_05_prepend_at_cap_evicts_the_oldest() {
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::ActivityLogs;

    let full: Vec<Value> = (0..ACTIVITY_LOG_CAP as u64).map(record).collect();
    replace(&mut store, kind, full).unwrap();

    let count = prepend_capped(&mut store, kind, record(9999), ACTIVITY_LOG_CAP).unwrap();
    assert_eq!(count, ACTIVITY_LOG_CAP);

    let logs = list(&store, kind).unwrap();
    assert_eq!(logs.len(), ACTIVITY_LOG_CAP);
    assert_eq!(logs[0], record(9999));
    // record(0) was at the front of the pre-cap list, so the evicted entry
    // is the back one: the oldest by insertion, record(ACTIVITY_LOG_CAP-1).
    assert_eq!(logs[ACTIVITY_LOG_CAP - 1], record(ACTIVITY_LOG_CAP as u64 - 2));
    assert!(!logs.contains(&record(ACTIVITY_LOG_CAP as u64 - 1)));
}

#[test]
fn at_ops_06_delete_by_id_removes_exact_matches_only() {
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::TobTemplates;
    replace(
        &mut store,
        kind,
        vec![
            json!({"id": "10", "name": "SME template"}),
            json!({"id": "11", "name": "Corporate template"}),
            json!({"id": 10, "name": "numeric twin"}),
        ],
    )
    .unwrap();

    let removed = delete_by_id(&mut store, kind, &json!("10")).unwrap();
    assert_eq!(removed, 1);

    let remaining = list(&store, kind).unwrap();
    assert_eq!(remaining.len(), 2);
    // The numeric id 10 is a different identity from the string "10".
    assert_eq!(remaining[0], json!({"id": "11", "name": "Corporate template"}));
    assert_eq!(remaining[1], json!({"id": 10, "name": "numeric twin"}));
}

#[test]
fn at_ops_07_delete_of_missing_id_is_a_noop_success() {
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::TobTemplates;
    let records = vec![json!({"id": "10"}), json!({"id": "11"})];
    replace(&mut store, kind, records.clone()).unwrap();

    let removed = delete_by_id(&mut store, kind, &json!("does-not-exist")).unwrap();
    assert_eq!(removed, 0);
    assert_eq!(list(&store, kind).unwrap(), records);
}

#[test]
fn at_ops_08_concurrent_style_replaces_last_write_wins() {
    // Two writers read the same initial state, then write one after the
    // other. The second replace is the final stored state; the first
    // writer's records are lost. This is the accepted consistency model,
    // not a bug.
    let mut store = MemoryCollectionStore::new();
    let kind = CollectionKind::Comparisons;
    replace(&mut store, kind, vec![record(1)]).unwrap();

    let mut writer_a = list(&store, kind).unwrap();
    let mut writer_b = list(&store, kind).unwrap();
    writer_a.push(record(100));
    writer_b.push(record(200));

    replace(&mut store, kind, writer_a).unwrap();
    replace(&mut store, kind, writer_b.clone()).unwrap();

    let stored = list(&store, kind).unwrap();
    assert_eq!(stored, writer_b);
    assert!(!stored.contains(&record(100)));
}
