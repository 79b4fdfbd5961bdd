#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;

#[test]
fn memory_cache_round_trips_within_ttl() {
    let cache = MemoryFeatureCache::new();
    cache.set_with_ttl("features:t:a:latest:0", "{\"x\":1.0}", 300).expect("set");
    assert_eq!(
        cache.get("features:t:a:latest:0").expect("get"),
        Some("{\"x\":1.0}".to_string())
    );
}

#[test]
fn memory_cache_expires_entries() {
    let cache = MemoryFeatureCache::new();
    cache.set_with_ttl("key", "value", 0).expect("set");
    assert_eq!(cache.get("key").expect("get"), None);
}

#[test]
fn memory_cache_deletes_entries() {
    let cache = MemoryFeatureCache::new();
    cache.set_with_ttl("key", "value", 300).expect("set");
    cache.delete("key").expect("delete");
    assert_eq!(cache.get("key").expect("get"), None);
}

#[test]
fn memory_backend_builds_without_a_url() {
    let config = CacheConfig::default();
    assert!(build_cache(&config).is_ok());
}

#[test]
fn redis_backend_requires_a_url() {
    let config = CacheConfig { backend: CacheBackend::Redis, url: None, ttl_seconds: 300 };
    assert!(build_cache(&config).is_err());
}
