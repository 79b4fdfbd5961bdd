#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

fn seeded_store() -> MemoryObjectStore {
    let store = MemoryObjectStore::new("ml-models");
    for key in [
        "tenant-a/forecast/v1/model.bin",
        "tenant-a/forecast/v1/metadata.json",
        "tenant-a/forecast/v2/model.bin",
        "tenant-a/anomaly/v1/model.bin",
        "tenant-b/forecast/v1/model.bin",
    ] {
        store.put(key, key.as_bytes().to_vec(), None).expect("put");
    }
    store
}

#[test]
fn get_returns_not_found_for_absent_keys() {
    let store = MemoryObjectStore::new("ml-models");
    match store.get("tenant-a/missing/v1/model.bin") {
        Err(ObjectStoreError::NotFound(_)) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn put_then_get_round_trips() {
    let store = MemoryObjectStore::new("ml-models");
    store.put("tenant-a/m/v1/model.bin", vec![7, 7, 7], Some("application/octet-stream"))
        .expect("put");
    assert_eq!(store.get("tenant-a/m/v1/model.bin").expect("get"), vec![7, 7, 7]);
}

#[test]
fn list_with_delimiter_groups_versions() {
    let store = seeded_store();
    let listing = store.list("tenant-a/forecast/", Some('/')).expect("list");
    assert_eq!(
        listing.common_prefixes,
        vec!["tenant-a/forecast/v1/".to_string(), "tenant-a/forecast/v2/".to_string()]
    );
    assert!(listing.keys.is_empty());
}

#[test]
fn list_without_delimiter_returns_all_keys() {
    let store = seeded_store();
    let listing = store.list("tenant-a/forecast/v1/", None).expect("list");
    assert_eq!(listing.keys.len(), 2);
}

#[test]
fn copy_duplicates_bytes() {
    let store = seeded_store();
    store
        .copy("tenant-a/forecast/v1/model.bin", "tenant-a/forecast/v3/model.bin")
        .expect("copy");
    assert_eq!(
        store.get("tenant-a/forecast/v3/model.bin").expect("get"),
        b"tenant-a/forecast/v1/model.bin".to_vec()
    );
}

#[test]
fn delete_prefix_removes_and_reports_keys() {
    let store = seeded_store();
    let deleted = store.delete_prefix("tenant-a/forecast/v1/").expect("delete");
    assert_eq!(deleted.len(), 2);
    assert!(store.get("tenant-a/forecast/v1/model.bin").is_err());
    assert!(store.get("tenant-a/forecast/v2/model.bin").is_ok());
}
