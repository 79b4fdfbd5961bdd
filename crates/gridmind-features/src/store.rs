// gridmind-features/src/store.rs
// ============================================================================
// Module: Feature Store
// Description: Online lookups, feature sets, and Parquet export.
// Purpose: Serve point lookups with write-through caching and bulk exports.
// Dependencies: gridmind-core, arrow, parquet, serde_json
// ============================================================================

//! ## Overview
//! Online lookups try the hot cache first, compute from the relational
//! store on a miss, and write through with the configured TTL. The cold
//! computation layers time features (always available), hourly and daily
//! aggregates, lag features at 1h/24h/168h, rolling windows at 24h/168h,
//! and the most recent weather row; any tier may degrade away on a store
//! error. Exports stream view rows into a snappy-compressed Parquet file
//! and record a durable export row either way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::array::Float64Array;
use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use gridmind_core::AssetId;
use gridmind_core::Event;
use gridmind_core::EventSink;
use gridmind_core::ExportId;
use gridmind_core::ExportStatus;
use gridmind_core::FeatureCache;
use gridmind_core::FeatureExport;
use gridmind_core::FeatureRepository;
use gridmind_core::FeatureRow;
use gridmind_core::FeatureVector;
use gridmind_core::LogLevel;
use gridmind_core::PlatformError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::resolve_feature_set;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lag distances computed for online lookups, in hours.
const LAG_HOURS: &[u32] = &[1, 24, 168];
/// Rolling window lengths computed for online lookups, in hours.
const ROLLING_WINDOWS_HOURS: &[u32] = &[24, 168];

/// Builds the canonical cache key for one lookup.
#[must_use]
pub fn cache_key(tenant_id: &TenantId, asset_id: &AssetId, label: &str, at: Timestamp) -> String {
    format!(
        "features:{tenant_id}:{asset_id}:{label}:{}",
        at.hour_bucket().unix_millis()
    )
}

/// Maps a feature-set name to its export view.
fn view_for_feature_set(feature_set: &str) -> Option<&'static str> {
    match feature_set {
        "forecast_basic" | "forecast_advanced" => Some("forecast_basic_features"),
        "anomaly_detection" => Some("anomaly_detection_features"),
        _ => None,
    }
}

// ============================================================================
// SECTION: Feature Store
// ============================================================================

/// Two-tier feature store.
pub struct FeatureStore {
    /// Hot cache; failures are logged and bypassed.
    cache: Arc<dyn FeatureCache>,
    /// Cold relational access.
    repository: Arc<dyn FeatureRepository>,
    /// Observability sink.
    events: Arc<dyn EventSink>,
    /// Write-through TTL in seconds.
    cache_ttl_seconds: u64,
    /// Directory receiving export files.
    export_dir: PathBuf,
}

impl FeatureStore {
    /// Creates a feature store from its collaborators.
    #[must_use]
    pub fn new(
        cache: Arc<dyn FeatureCache>,
        repository: Arc<dyn FeatureRepository>,
        events: Arc<dyn EventSink>,
        cache_ttl_seconds: u64,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { cache, repository, events, cache_ttl_seconds, export_dir: export_dir.into() }
    }

    /// Serves one online lookup, optionally projected to specific names.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] only when the cold computation fails
    /// entirely; cache failures degrade to a miss.
    pub fn get_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Option<Timestamp>,
        feature_names: Option<&[&str]>,
    ) -> Result<FeatureVector, PlatformError> {
        let at = at.unwrap_or_else(Timestamp::now);
        let key = cache_key(tenant_id, asset_id, "latest", at);
        match self.cache.get(&key) {
            Ok(Some(cached)) => {
                if let Ok(vector) = serde_json::from_str::<FeatureVector>(&cached) {
                    return Ok(project(vector, feature_names));
                }
                self.warn(tenant_id, "cached feature payload failed to decode");
            }
            Ok(None) => {}
            Err(err) => self.warn(tenant_id, &format!("feature cache read bypassed: {err}")),
        }
        let vector = self.compute_features(tenant_id, asset_id, at);
        match serde_json::to_string(&vector) {
            Ok(payload) => {
                if let Err(err) = self.cache.set_with_ttl(&key, &payload, self.cache_ttl_seconds)
                {
                    self.warn(tenant_id, &format!("feature cache write bypassed: {err}"));
                }
            }
            Err(err) => self.warn(tenant_id, &format!("feature payload encode failed: {err}")),
        }
        Ok(project(vector, feature_names))
    }

    /// Serves a named feature-set lookup; unknown names fall back to the
    /// full vector with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] only when the cold computation fails
    /// entirely.
    pub fn get_feature_set(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        feature_set: &str,
        at: Option<Timestamp>,
    ) -> Result<FeatureVector, PlatformError> {
        let names = resolve_feature_set(feature_set);
        if names.is_none() {
            self.warn(tenant_id, &format!("unknown feature set: {feature_set}"));
        }
        self.get_features(tenant_id, asset_id, at, names)
    }

    /// Drops the cached entry for one asset.
    pub fn invalidate_cache(&self, tenant_id: &TenantId, asset_id: &AssetId, at: Timestamp) {
        let key = cache_key(tenant_id, asset_id, "latest", at);
        if let Err(err) = self.cache.delete(&key) {
            self.warn(tenant_id, &format!("feature cache invalidation bypassed: {err}"));
        }
    }

    /// Computes the cold feature vector, degrading per tier.
    fn compute_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
    ) -> FeatureVector {
        let mut vector = FeatureVector::new();
        // Time features are the guaranteed floor.
        let calendar = at.calendar();
        vector.set("hour_of_day", Some(f64::from(calendar.hour_of_day)));
        vector.set("day_of_week", Some(f64::from(calendar.day_of_week)));
        vector.set("day_of_month", Some(f64::from(calendar.day_of_month)));
        vector.set("month", Some(f64::from(calendar.month)));
        vector.set("quarter", Some(f64::from(calendar.quarter)));
        vector.set("is_weekend", Some(if calendar.is_weekend { 1.0 } else { 0.0 }));

        match self.repository.hourly_aggregate(tenant_id, asset_id, at) {
            Ok(Some(hourly)) => {
                vector.set("hourly_avg", Some(hourly.avg));
                vector.set("hourly_std", Some(hourly.std));
                vector.set("hourly_min", Some(hourly.min));
                vector.set("hourly_max", Some(hourly.max));
                vector.set("hourly_median", Some(hourly.median));
                vector.set("hourly_cv", Some(hourly.cv));
            }
            Ok(None) => {}
            Err(err) => self.warn(tenant_id, &format!("hourly tier degraded: {err}")),
        }
        match self.repository.daily_aggregate(tenant_id, asset_id, at) {
            Ok(Some(daily)) => {
                vector.set("daily_avg", Some(daily.avg));
                vector.set("daily_std", Some(daily.std));
                vector.set("daily_min", Some(daily.min));
                vector.set("daily_max", Some(daily.max));
            }
            Ok(None) => {}
            Err(err) => self.warn(tenant_id, &format!("daily tier degraded: {err}")),
        }
        match self.repository.lag_features(tenant_id, asset_id, at, LAG_HOURS) {
            Ok(lags) => {
                for lag in lags {
                    vector.set(format!("lag_{}h", lag.lag_hours), lag.value);
                }
            }
            Err(err) => self.warn(tenant_id, &format!("lag tier degraded: {err}")),
        }
        for &window in ROLLING_WINDOWS_HOURS {
            match self.repository.rolling_features(tenant_id, asset_id, at, window) {
                Ok(Some(rolling)) => {
                    vector.set(format!("rolling_{window}h_avg"), Some(rolling.avg));
                    vector.set(format!("rolling_{window}h_std"), Some(rolling.std));
                    vector.set(format!("rolling_{window}h_min"), Some(rolling.min));
                    vector.set(format!("rolling_{window}h_max"), Some(rolling.max));
                    vector.set(format!("rolling_{window}h_median"), Some(rolling.median));
                    vector.set(
                        format!("rolling_{window}h_count"),
                        Some(rolling.count as f64),
                    );
                }
                Ok(None) => {}
                Err(err) => self.warn(tenant_id, &format!("rolling tier degraded: {err}")),
            }
        }
        match self.repository.latest_weather(tenant_id, at) {
            Ok(Some(weather)) => {
                vector.set("temperature", weather.temperature);
                vector.set("humidity", weather.humidity);
                vector.set("wind_speed", weather.wind_speed);
                vector.set("solar_irradiance", weather.solar_irradiance);
                vector.set("cloud_cover", weather.cloud_cover);
                vector.set("precipitation", weather.precipitation);
            }
            Ok(None) => {}
            Err(err) => self.warn(tenant_id, &format!("weather tier degraded: {err}")),
        }
        vector
    }

    /// Exports a feature set over a window into a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown feature sets; I/O
    /// failures insert a failed export row and surface the error.
    pub fn export_to_parquet(
        &self,
        tenant_id: &TenantId,
        feature_set: &str,
        start: Timestamp,
        end: Timestamp,
        asset_ids: &[AssetId],
    ) -> Result<FeatureExport, PlatformError> {
        let Some(view) = view_for_feature_set(feature_set) else {
            return Err(PlatformError::Validation(format!(
                "unknown feature set: {feature_set}"
            )));
        };
        let export_id = ExportId::from(format!("export-{}", uuid::Uuid::new_v4()));
        let rows = self.repository.feature_rows(view, tenant_id, start, end, asset_ids)?;
        if rows.is_empty() {
            let export = FeatureExport {
                export_id,
                tenant_id: tenant_id.clone(),
                feature_set: feature_set.to_string(),
                start_time: start,
                end_time: end,
                asset_ids: asset_ids.to_vec(),
                row_count: 0,
                file_size_bytes: 0,
                storage_path: None,
                status: ExportStatus::NoData,
                error_message: None,
                completed_at: Some(Timestamp::now()),
            };
            self.repository.insert_export(&export)?;
            return Ok(export);
        }
        let path = self.export_dir.join(format!(
            "{tenant_id}_{feature_set}_{}.parquet",
            export_id.as_str()
        ));
        match write_parquet(&path, &rows) {
            Ok(file_size_bytes) => {
                let export = FeatureExport {
                    export_id,
                    tenant_id: tenant_id.clone(),
                    feature_set: feature_set.to_string(),
                    start_time: start,
                    end_time: end,
                    asset_ids: asset_ids.to_vec(),
                    row_count: rows.len() as u64,
                    file_size_bytes,
                    storage_path: Some(path.to_string_lossy().into_owned()),
                    status: ExportStatus::Completed,
                    error_message: None,
                    completed_at: Some(Timestamp::now()),
                };
                self.repository.insert_export(&export)?;
                Ok(export)
            }
            Err(err) => {
                let export = FeatureExport {
                    export_id,
                    tenant_id: tenant_id.clone(),
                    feature_set: feature_set.to_string(),
                    start_time: start,
                    end_time: end,
                    asset_ids: asset_ids.to_vec(),
                    row_count: 0,
                    file_size_bytes: 0,
                    storage_path: None,
                    status: ExportStatus::Failed,
                    error_message: Some(err.message().to_string()),
                    completed_at: Some(Timestamp::now()),
                };
                self.repository.insert_export(&export)?;
                Err(err)
            }
        }
    }

    /// Lists export rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] when the store query fails.
    pub fn list_exports(
        &self,
        tenant_id: Option<&TenantId>,
        feature_set: Option<&str>,
        status: Option<ExportStatus>,
    ) -> Result<Vec<FeatureExport>, PlatformError> {
        Ok(self.repository.list_exports(tenant_id, feature_set, status)?)
    }

    /// Emits a warning event scoped to a tenant.
    fn warn(&self, tenant_id: &TenantId, message: &str) {
        let mut correlation = BTreeMap::new();
        correlation.insert("tenant_id".to_string(), tenant_id.to_string());
        self.events.emit(&Event {
            at: Timestamp::now(),
            level: LogLevel::Warning,
            component: "feature_store".to_string(),
            message: message.to_string(),
            correlation,
        });
    }
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Projects a vector onto requested names when given.
fn project(vector: FeatureVector, names: Option<&[&str]>) -> FeatureVector {
    match names {
        Some(names) => vector.project(names),
        None => vector,
    }
}

// ============================================================================
// SECTION: Parquet Writing
// ============================================================================

/// Writes view rows into a snappy-compressed Parquet file, returning the
/// written byte size.
fn write_parquet(path: &std::path::Path, rows: &[FeatureRow]) -> Result<u64, PlatformError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    }
    let feature_columns: Vec<String> = rows
        .first()
        .map(|row| row.values.iter().map(|(name, _)| name.to_string()).collect())
        .unwrap_or_default();
    let mut fields = vec![
        Field::new("asset_id", DataType::Utf8, false),
        Field::new("timestamp", DataType::Int64, false),
    ];
    for name in &feature_columns {
        fields.push(Field::new(name, DataType::Float64, true));
    }
    let schema = Arc::new(Schema::new(fields));
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(feature_columns.len() + 2);
    columns.push(Arc::new(StringArray::from_iter_values(
        rows.iter().map(|row| row.asset_id.as_str()),
    )));
    columns.push(Arc::new(Int64Array::from_iter_values(
        rows.iter().map(|row| row.timestamp.unix_millis()),
    )));
    for name in &feature_columns {
        columns.push(Arc::new(Float64Array::from_iter(
            rows.iter().map(|row| row.values.get(name).flatten()),
        )));
    }
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|err| PlatformError::Internal(err.to_string()))?;
    let file =
        fs::File::create(path).map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    let properties =
        WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(properties))
        .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    writer.write(&batch).map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    writer.close().map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    let metadata =
        fs::metadata(path).map_err(|err| PlatformError::Unavailable(err.to_string()))?;
    Ok(metadata.len())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
