#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::sync::Mutex;

use gridmind_core::CacheError;
use gridmind_core::StoreError;
use gridmind_core::time::MILLIS_PER_HOUR;
use gridmind_store_sqlite::SqliteStore;

use crate::cache::MemoryFeatureCache;

use super::*;

/// 2025-01-06T00:00:00Z (a Monday).
const MONDAY: i64 = 1_736_121_600_000;

/// Event sink collecting warnings.
#[derive(Default)]
struct CollectingSink {
    /// Captured messages.
    messages: Mutex<Vec<String>>,
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &Event) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(event.message.clone());
        }
    }
}

/// Cache that fails every operation.
struct BrokenCache;

impl FeatureCache for BrokenCache {
    fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    fn set_with_ttl(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }

    fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Connection("connection refused".to_string()))
    }
}

/// Repository whose aggregate tiers fail while time features survive.
struct DegradedRepository {
    /// Healthy inner repository.
    inner: SqliteStore,
}

impl FeatureRepository for DegradedRepository {
    fn hourly_aggregate(
        &self,
        _tenant_id: &TenantId,
        _asset_id: &AssetId,
        _at: Timestamp,
    ) -> Result<Option<gridmind_core::HourlyAggregate>, StoreError> {
        Err(StoreError::Db("hourly view offline".to_string()))
    }

    fn daily_aggregate(
        &self,
        _tenant_id: &TenantId,
        _asset_id: &AssetId,
        _at: Timestamp,
    ) -> Result<Option<gridmind_core::DailyAggregate>, StoreError> {
        Err(StoreError::Db("daily view offline".to_string()))
    }

    fn lag_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        lags: &[u32],
    ) -> Result<Vec<gridmind_core::LagFeature>, StoreError> {
        self.inner.lag_features(tenant_id, asset_id, at, lags)
    }

    fn rolling_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        window_hours: u32,
    ) -> Result<Option<gridmind_core::RollingWindow>, StoreError> {
        self.inner.rolling_features(tenant_id, asset_id, at, window_hours)
    }

    fn latest_weather(
        &self,
        tenant_id: &TenantId,
        at: Timestamp,
    ) -> Result<Option<gridmind_core::WeatherObservation>, StoreError> {
        self.inner.latest_weather(tenant_id, at)
    }

    fn feature_rows(
        &self,
        view: &str,
        tenant_id: &TenantId,
        start: Timestamp,
        end: Timestamp,
        asset_ids: &[AssetId],
    ) -> Result<Vec<FeatureRow>, StoreError> {
        self.inner.feature_rows(view, tenant_id, start, end, asset_ids)
    }

    fn insert_export(&self, export: &FeatureExport) -> Result<(), StoreError> {
        self.inner.insert_export(export)
    }

    fn list_exports(
        &self,
        tenant_id: Option<&TenantId>,
        feature_set: Option<&str>,
        status: Option<ExportStatus>,
    ) -> Result<Vec<FeatureExport>, StoreError> {
        self.inner.list_exports(tenant_id, feature_set, status)
    }
}

fn seeded_repository() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let asset = AssetId::from("meter-1");
    for hour in 0 .. 200_i64 {
        let at = Timestamp::from_unix_millis(MONDAY - 168 * MILLIS_PER_HOUR + hour * MILLIS_PER_HOUR);
        store
            .insert_measurement(&tenant, &asset, at, 100.0 + (hour % 24) as f64)
            .expect("insert");
    }
    store
}

fn feature_store(
    cache: Arc<dyn FeatureCache>,
    repository: Arc<dyn FeatureRepository>,
) -> (FeatureStore, tempfile::TempDir, Arc<CollectingSink>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = Arc::new(CollectingSink::default());
    let store = FeatureStore::new(cache, repository, sink.clone(), 300, dir.path());
    (store, dir, sink)
}

#[test]
fn online_lookup_layers_all_tiers() {
    let repository = Arc::new(seeded_repository());
    let (store, _dir, _sink) =
        feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    let vector = store
        .get_features(
            &TenantId::from("tenant-a"),
            &AssetId::from("meter-1"),
            Some(Timestamp::from_unix_millis(MONDAY)),
            None,
        )
        .expect("features");
    assert_eq!(vector.get("hour_of_day"), Some(Some(0.0)));
    assert_eq!(vector.get("day_of_week"), Some(Some(0.0)));
    assert!(vector.get("hourly_avg").expect("hourly tier").is_some());
    assert!(vector.get("daily_avg").expect("daily tier").is_some());
    assert!(vector.get("lag_1h").expect("lag tier").is_some());
    assert!(vector.get("rolling_24h_avg").expect("rolling tier").is_some());
}

#[test]
fn write_through_serves_the_cached_vector_within_ttl() {
    // A get after a successful write-through for the same canonical key
    // returns the written map.
    let repository = Arc::new(seeded_repository());
    let cache = Arc::new(MemoryFeatureCache::new());
    let (store, _dir, _sink) = feature_store(cache.clone(), repository);
    let tenant = TenantId::from("tenant-a");
    let asset = AssetId::from("meter-1");
    let at = Timestamp::from_unix_millis(MONDAY);
    let first = store.get_features(&tenant, &asset, Some(at), None).expect("first");
    let key = cache_key(&tenant, &asset, "latest", at);
    assert!(cache.get(&key).expect("cached").is_some());
    let second = store.get_features(&tenant, &asset, Some(at), None).expect("second");
    assert_eq!(first, second);
}

#[test]
fn cache_failures_never_fail_the_request() {
    let repository = Arc::new(seeded_repository());
    let (store, _dir, sink) = feature_store(Arc::new(BrokenCache), repository);
    let vector = store
        .get_features(
            &TenantId::from("tenant-a"),
            &AssetId::from("meter-1"),
            Some(Timestamp::from_unix_millis(MONDAY)),
            None,
        )
        .expect("features despite broken cache");
    assert!(!vector.is_empty());
    let messages = sink.messages.lock().expect("lock");
    assert!(messages.iter().any(|message| message.contains("cache read bypassed")));
}

#[test]
fn failing_tiers_degrade_to_the_time_floor() {
    let repository = Arc::new(DegradedRepository { inner: seeded_repository() });
    let (store, _dir, sink) = feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    let vector = store
        .get_features(
            &TenantId::from("tenant-a"),
            &AssetId::from("meter-1"),
            Some(Timestamp::from_unix_millis(MONDAY)),
            None,
        )
        .expect("degraded features");
    // Time features survive; the hourly tier is absent.
    assert_eq!(vector.get("hour_of_day"), Some(Some(0.0)));
    assert!(vector.get("hourly_avg").is_none());
    // Healthy tiers still contribute.
    assert!(vector.get("lag_1h").expect("lag tier").is_some());
    let messages = sink.messages.lock().expect("lock");
    assert!(messages.iter().any(|message| message.contains("hourly tier degraded")));
}

#[test]
fn named_sets_project_and_unknown_sets_fall_back() {
    let repository = Arc::new(seeded_repository());
    let (store, _dir, sink) = feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    let tenant = TenantId::from("tenant-a");
    let asset = AssetId::from("meter-1");
    let at = Some(Timestamp::from_unix_millis(MONDAY));
    let basic = store
        .get_feature_set(&tenant, &asset, "forecast_basic", at)
        .expect("set");
    assert!(basic.get("hour_of_day").is_some());
    assert!(basic.get("quarter").is_none());
    let unknown = store
        .get_feature_set(&tenant, &asset, "does_not_exist", at)
        .expect("fallback");
    assert!(unknown.get("quarter").is_some());
    let messages = sink.messages.lock().expect("lock");
    assert!(messages.iter().any(|message| message.contains("unknown feature set")));
}

#[test]
fn export_writes_a_parquet_file_and_records_the_row() {
    let repository = Arc::new(seeded_repository());
    let (store, _dir, _sink) =
        feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    let export = store
        .export_to_parquet(
            &TenantId::from("tenant-a"),
            "forecast_basic",
            Timestamp::from_unix_millis(MONDAY - 24 * MILLIS_PER_HOUR),
            Timestamp::from_unix_millis(MONDAY),
            &[],
        )
        .expect("export");
    assert_eq!(export.status, ExportStatus::Completed);
    assert_eq!(export.row_count, 25);
    assert!(export.file_size_bytes > 0);
    let path = export.storage_path.clone().expect("path");
    assert!(std::path::Path::new(&path).exists());
    let listed = store
        .list_exports(Some(&TenantId::from("tenant-a")), None, None)
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].export_id, export.export_id);
}

#[test]
fn export_over_an_empty_window_records_no_data_without_a_file() {
    // Scenario: an export over a far-future window yields no_data with a
    // zero row count and no partial file.
    let repository = Arc::new(seeded_repository());
    let (store, dir, _sink) =
        feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    let export = store
        .export_to_parquet(
            &TenantId::from("tenant-x"),
            "forecast_basic",
            Timestamp::from_unix_millis(4_070_908_800_000),
            Timestamp::from_unix_millis(4_102_444_800_000),
            &[],
        )
        .expect("export");
    assert_eq!(export.status, ExportStatus::NoData);
    assert_eq!(export.row_count, 0);
    assert_eq!(export.file_size_bytes, 0);
    assert!(export.storage_path.is_none());
    assert_eq!(fs::read_dir(dir.path()).expect("dir").count(), 0);
    let listed = store
        .list_exports(None, None, Some(ExportStatus::NoData))
        .expect("list");
    assert_eq!(listed.len(), 1);
}

#[test]
fn export_rejects_unknown_feature_sets() {
    let repository = Arc::new(seeded_repository());
    let (store, _dir, _sink) =
        feature_store(Arc::new(MemoryFeatureCache::new()), repository);
    assert!(matches!(
        store.export_to_parquet(
            &TenantId::from("tenant-a"),
            "nope",
            Timestamp::from_unix_millis(MONDAY),
            Timestamp::from_unix_millis(MONDAY),
            &[],
        ),
        Err(PlatformError::Validation(_))
    ));
}

#[test]
fn invalidation_drops_the_cached_entry() {
    let repository = Arc::new(seeded_repository());
    let cache = Arc::new(MemoryFeatureCache::new());
    let (store, _dir, _sink) = feature_store(cache.clone(), repository);
    let tenant = TenantId::from("tenant-a");
    let asset = AssetId::from("meter-1");
    let at = Timestamp::from_unix_millis(MONDAY);
    store.get_features(&tenant, &asset, Some(at), None).expect("prime");
    let key = cache_key(&tenant, &asset, "latest", at);
    assert!(cache.get(&key).expect("cached").is_some());
    store.invalidate_cache(&tenant, &asset, at);
    assert!(cache.get(&key).expect("cached").is_none());
}
