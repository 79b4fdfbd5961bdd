#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use super::*;
use crate::store::SqliteStore;

/// 2025-01-06T00:00:00Z (a Monday).
const MONDAY: i64 = 1_736_121_600_000;

fn seeded_store() -> (SqliteStore, TenantId, AssetId) {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let asset = AssetId::from("meter-1");
    // One week of hourly readings ending at MONDAY + 48h.
    for hour in 0 .. 216 {
        let at = Timestamp::from_unix_millis(MONDAY - 168 * MILLIS_PER_HOUR + hour * MILLIS_PER_HOUR);
        let value = 100.0 + (hour % 24) as f64;
        store.insert_measurement(&tenant, &asset, at, value).expect("insert");
    }
    (store, tenant, asset)
}

#[test]
fn hourly_aggregate_reads_containing_bucket() {
    let (store, tenant, asset) = seeded_store();
    let at = Timestamp::from_unix_millis(MONDAY + 30 * 60_000);
    let aggregate = store.hourly_aggregate(&tenant, &asset, at).expect("query").expect("row");
    // Exactly one reading per hour bucket.
    assert!(aggregate.std.abs() < f64::EPSILON);
    assert!((aggregate.avg - aggregate.median).abs() < f64::EPSILON);
}

#[test]
fn daily_aggregate_covers_the_day() {
    let (store, tenant, asset) = seeded_store();
    let aggregate = store
        .daily_aggregate(&tenant, &asset, Timestamp::from_unix_millis(MONDAY))
        .expect("query")
        .expect("row");
    assert!((aggregate.min - 100.0).abs() < f64::EPSILON);
    assert!((aggregate.max - 123.0).abs() < f64::EPSILON);
}

#[test]
fn lag_features_return_exact_hours_and_gaps() {
    let (store, tenant, asset) = seeded_store();
    let at = Timestamp::from_unix_millis(MONDAY);
    let lags = store
        .lag_features(&tenant, &asset, at, &[1, 24, 168])
        .expect("query");
    assert_eq!(lags.len(), 3);
    assert_eq!(lags[0].lag_hours, 1);
    assert!(lags[0].value.is_some());
    assert!(lags[2].value.is_some());
    // A lag beyond the seeded history is a gap, not an error.
    let far = store.lag_features(&tenant, &asset, at, &[4_000]).expect("query");
    assert_eq!(far[0].value, None);
}

#[test]
fn rolling_window_counts_observations() {
    let (store, tenant, asset) = seeded_store();
    let at = Timestamp::from_unix_millis(MONDAY);
    let window = store
        .rolling_features(&tenant, &asset, at, 24)
        .expect("query")
        .expect("row");
    // 24 trailing hours plus the anchor observation.
    assert_eq!(window.count, 25);
    assert!(window.min <= window.median && window.median <= window.max);
}

#[test]
fn latest_weather_picks_most_recent_at_or_before() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    for (offset, temperature) in [(0_i64, 10.0), (1, 11.0), (2, 12.0)] {
        store
            .insert_weather(
                &tenant,
                Timestamp::from_unix_millis(MONDAY + offset * MILLIS_PER_HOUR),
                &WeatherObservation {
                    temperature: Some(temperature),
                    humidity: Some(60.0),
                    wind_speed: None,
                    solar_irradiance: None,
                    cloud_cover: None,
                    precipitation: None,
                },
            )
            .expect("insert");
    }
    let observation = store
        .latest_weather(&tenant, Timestamp::from_unix_millis(MONDAY + MILLIS_PER_HOUR + 1))
        .expect("query")
        .expect("row");
    assert_eq!(observation.temperature, Some(11.0));
    assert!(
        store
            .latest_weather(&tenant, Timestamp::from_unix_millis(MONDAY - MILLIS_PER_HOUR))
            .expect("query")
            .is_none()
    );
}

#[test]
fn feature_rows_come_from_whitelisted_views_only() {
    let (store, tenant, _) = seeded_store();
    assert!(matches!(
        store.feature_rows(
            "jobs",
            &tenant,
            Timestamp::from_unix_millis(MONDAY),
            Timestamp::from_unix_millis(MONDAY + MILLIS_PER_DAY),
            &[],
        ),
        Err(StoreError::Invalid(_))
    ));
}

#[test]
fn forecast_view_rows_carry_lags_and_target() {
    let (store, tenant, asset) = seeded_store();
    let rows = store
        .feature_rows(
            "forecast_basic_features",
            &tenant,
            Timestamp::from_unix_millis(MONDAY),
            Timestamp::from_unix_millis(MONDAY + MILLIS_PER_DAY - 1),
            &[asset.clone()],
        )
        .expect("rows");
    assert_eq!(rows.len(), 24);
    let first = &rows[0];
    assert_eq!(first.values.get("hour_of_day"), Some(Some(0.0)));
    assert_eq!(first.values.get("day_of_week"), Some(Some(0.0)));
    assert!(first.values.get("lag_1h").expect("column").is_some());
    assert!(first.values.get("load_kw").expect("column").is_some());
}

#[test]
fn asset_filter_limits_rows() {
    let (store, tenant, _asset) = seeded_store();
    let other = AssetId::from("meter-2");
    store
        .insert_measurement(&tenant, &other, Timestamp::from_unix_millis(MONDAY), 55.0)
        .expect("insert");
    let rows = store
        .feature_rows(
            "forecast_basic_features",
            &tenant,
            Timestamp::from_unix_millis(MONDAY),
            Timestamp::from_unix_millis(MONDAY),
            &[other.clone()],
        )
        .expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].asset_id, other);
}

#[test]
fn export_rows_round_trip_with_filters() {
    let store = SqliteStore::open_in_memory().expect("open");
    let tenant = TenantId::from("tenant-a");
    let export = FeatureExport {
        export_id: ExportId::from("export-1"),
        tenant_id: tenant.clone(),
        feature_set: "forecast_basic".to_string(),
        start_time: Timestamp::from_unix_millis(MONDAY),
        end_time: Timestamp::from_unix_millis(MONDAY + MILLIS_PER_DAY),
        asset_ids: vec![AssetId::from("meter-1")],
        row_count: 24,
        file_size_bytes: 2_048,
        storage_path: Some("./exports/export-1.parquet".to_string()),
        status: ExportStatus::Completed,
        error_message: None,
        completed_at: Some(Timestamp::from_unix_millis(MONDAY + MILLIS_PER_DAY)),
    };
    store.insert_export(&export).expect("insert");
    let failed = FeatureExport {
        export_id: ExportId::from("export-2"),
        status: ExportStatus::Failed,
        error_message: Some("disk full".to_string()),
        storage_path: None,
        row_count: 0,
        file_size_bytes: 0,
        completed_at: None,
        ..export.clone()
    };
    store.insert_export(&failed).expect("insert");
    let all = store.list_exports(Some(&tenant), None, None).expect("list");
    assert_eq!(all.len(), 2);
    let completed = store
        .list_exports(Some(&tenant), Some("forecast_basic"), Some(ExportStatus::Completed))
        .expect("list");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0], export);
}
