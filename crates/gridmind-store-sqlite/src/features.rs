// gridmind-store-sqlite/src/features.rs
// ============================================================================
// Module: SQLite Feature Repository
// Description: Cold feature queries, window functions, and export rows.
// Purpose: Implement the FeatureRepository interface over the shared connection.
// Dependencies: gridmind-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Aggregate tiers read raw measurements for the containing bucket and
//! derive the statistics SQLite cannot compute natively (stddev, median).
//! The lag and rolling queries are the relational counterparts of the
//! `get_lag_features` / `get_rolling_features` stored functions; feature
//! rows come from the whitelisted views created with the schema.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gridmind_core::AssetId;
use gridmind_core::DailyAggregate;
use gridmind_core::ExportId;
use gridmind_core::ExportStatus;
use gridmind_core::FeatureExport;
use gridmind_core::FeatureRepository;
use gridmind_core::FeatureRow;
use gridmind_core::FeatureVector;
use gridmind_core::HourlyAggregate;
use gridmind_core::LagFeature;
use gridmind_core::RollingWindow;
use gridmind_core::StoreError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::WeatherObservation;
use gridmind_core::time::MILLIS_PER_DAY;
use gridmind_core::time::MILLIS_PER_HOUR;
use rusqlite::Connection;
use rusqlite::ToSql;
use rusqlite::params;

use crate::store::SqliteStore;
use crate::store::db_err;
use crate::store::from_json;
use crate::store::to_json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Views the exporter and the training loader may read.
const ALLOWED_VIEWS: &[&str] = &["forecast_basic_features", "anomaly_detection_features"];

// ============================================================================
// SECTION: Ingestion Helpers
// ============================================================================

impl SqliteStore {
    /// Inserts or replaces one raw measurement.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    pub fn insert_measurement(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        value: f64,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO measurements (tenant_id, asset_id, ts, value) VALUES (?1, ?2, ?3, \
                 ?4) ON CONFLICT(tenant_id, asset_id, ts) DO UPDATE SET value = excluded.value",
                params![tenant_id.as_str(), asset_id.as_str(), at.unix_millis(), value],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    /// Inserts or replaces one weather observation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    pub fn insert_weather(
        &self,
        tenant_id: &TenantId,
        at: Timestamp,
        observation: &WeatherObservation,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO weather (tenant_id, ts, temperature, humidity, wind_speed, \
                 solar_irradiance, cloud_cover, precipitation) VALUES (?1, ?2, ?3, ?4, ?5, ?6, \
                 ?7, ?8) ON CONFLICT(tenant_id, ts) DO UPDATE SET temperature = \
                 excluded.temperature, humidity = excluded.humidity, wind_speed = \
                 excluded.wind_speed, solar_irradiance = excluded.solar_irradiance, cloud_cover \
                 = excluded.cloud_cover, precipitation = excluded.precipitation",
                params![
                    tenant_id.as_str(),
                    at.unix_millis(),
                    observation.temperature,
                    observation.humidity,
                    observation.wind_speed,
                    observation.solar_irradiance,
                    observation.cloud_cover,
                    observation.precipitation,
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Statistics Helpers
// ============================================================================

/// Queries raw measurement values for a half-open window.
fn window_values(
    connection: &Connection,
    tenant_id: &TenantId,
    asset_id: &AssetId,
    start_millis: i64,
    end_millis: i64,
) -> Result<Vec<f64>, StoreError> {
    let mut statement = connection
        .prepare(
            "SELECT value FROM measurements WHERE tenant_id = ?1 AND asset_id = ?2 AND ts >= \
             ?3 AND ts < ?4 ORDER BY ts ASC",
        )
        .map_err(|err| db_err(&err))?;
    let values = statement
        .query_map(
            params![tenant_id.as_str(), asset_id.as_str(), start_millis, end_millis],
            |row| row.get::<_, f64>(0),
        )
        .map_err(|err| db_err(&err))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| db_err(&err))?;
    Ok(values)
}

/// Mean of a non-empty slice.
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation of a non-empty slice.
fn std_dev(values: &[f64]) -> f64 {
    let mu = mean(values);
    (values.iter().map(|value| (value - mu).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Median of a non-empty slice.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 { (sorted[mid - 1] + sorted[mid]) / 2.0 } else { sorted[mid] }
}

/// Minimum of a non-empty slice.
fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Maximum of a non-empty slice.
fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

// ============================================================================
// SECTION: FeatureRepository Implementation
// ============================================================================

impl FeatureRepository for SqliteStore {
    fn hourly_aggregate(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
    ) -> Result<Option<HourlyAggregate>, StoreError> {
        let bucket = at.hour_bucket().unix_millis();
        let guard = self.lock()?;
        let values =
            window_values(&guard, tenant_id, asset_id, bucket, bucket + MILLIS_PER_HOUR)?;
        if values.is_empty() {
            return Ok(None);
        }
        let avg = mean(&values);
        let std = std_dev(&values);
        Ok(Some(HourlyAggregate {
            avg,
            std,
            min: min(&values),
            max: max(&values),
            median: median(&values),
            cv: if avg == 0.0 { 0.0 } else { std / avg },
        }))
    }

    fn daily_aggregate(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
    ) -> Result<Option<DailyAggregate>, StoreError> {
        let bucket = at.day_bucket().unix_millis();
        let guard = self.lock()?;
        let values = window_values(&guard, tenant_id, asset_id, bucket, bucket + MILLIS_PER_DAY)?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(DailyAggregate {
            avg: mean(&values),
            std: std_dev(&values),
            min: min(&values),
            max: max(&values),
        }))
    }

    fn lag_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        lags_hours: &[u32],
    ) -> Result<Vec<LagFeature>, StoreError> {
        let guard = self.lock()?;
        let anchor = at.hour_bucket();
        let mut features = Vec::with_capacity(lags_hours.len());
        for &lag in lags_hours {
            let lagged = anchor.minus_hours(i64::from(lag)).unix_millis();
            let value: Option<f64> = guard
                .query_row(
                    "SELECT value FROM measurements WHERE tenant_id = ?1 AND asset_id = ?2 AND \
                     ts = ?3",
                    params![tenant_id.as_str(), asset_id.as_str(), lagged],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|err| match err {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(db_err(&other)),
                })?;
            features.push(LagFeature { lag_hours: lag, value });
        }
        Ok(features)
    }

    fn rolling_features(
        &self,
        tenant_id: &TenantId,
        asset_id: &AssetId,
        at: Timestamp,
        window_hours: u32,
    ) -> Result<Option<RollingWindow>, StoreError> {
        let end = at.unix_millis() + 1;
        let start = at.minus_hours(i64::from(window_hours)).unix_millis();
        let guard = self.lock()?;
        let values = window_values(&guard, tenant_id, asset_id, start, end)?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(RollingWindow {
            avg: mean(&values),
            std: std_dev(&values),
            min: min(&values),
            max: max(&values),
            median: median(&values),
            count: values.len() as u64,
        }))
    }

    fn latest_weather(
        &self,
        tenant_id: &TenantId,
        at: Timestamp,
    ) -> Result<Option<WeatherObservation>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT temperature, humidity, wind_speed, solar_irradiance, cloud_cover, \
                 precipitation FROM weather WHERE tenant_id = ?1 AND ts <= ?2 ORDER BY ts DESC \
                 LIMIT 1",
                params![tenant_id.as_str(), at.unix_millis()],
                |row| {
                    Ok(WeatherObservation {
                        temperature: row.get(0)?,
                        humidity: row.get(1)?,
                        wind_speed: row.get(2)?,
                        solar_irradiance: row.get(3)?,
                        cloud_cover: row.get(4)?,
                        precipitation: row.get(5)?,
                    })
                },
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(db_err(&other)),
            })
    }

    fn feature_rows(
        &self,
        view: &str,
        tenant_id: &TenantId,
        start: Timestamp,
        end: Timestamp,
        asset_ids: &[AssetId],
    ) -> Result<Vec<FeatureRow>, StoreError> {
        if !ALLOWED_VIEWS.contains(&view) {
            return Err(StoreError::Invalid(format!("unknown feature view: {view}")));
        }
        let mut query = format!(
            "SELECT * FROM {view} WHERE tenant_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3"
        );
        let mut values: Vec<Box<dyn ToSql>> = vec![
            Box::new(tenant_id.as_str().to_string()),
            Box::new(start.unix_millis()),
            Box::new(end.unix_millis()),
        ];
        if !asset_ids.is_empty() {
            let placeholders: Vec<String> = asset_ids
                .iter()
                .enumerate()
                .map(|(index, _)| format!("?{}", values.len() + index + 1))
                .collect();
            query.push_str(&format!(" AND asset_id IN ({})", placeholders.join(", ")));
            for asset in asset_ids {
                values.push(Box::new(asset.as_str().to_string()));
            }
        }
        query.push_str(" ORDER BY asset_id, timestamp");
        let guard = self.lock()?;
        let mut statement = guard.prepare(&query).map_err(|err| db_err(&err))?;
        let columns: Vec<String> =
            statement.column_names().iter().map(ToString::to_string).collect();
        let params_ref: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let rows = statement
            .query_map(params_ref.as_slice(), |row| {
                let mut asset_id = String::new();
                let mut timestamp = 0i64;
                let mut vector_values = Vec::new();
                for (index, column) in columns.iter().enumerate() {
                    match column.as_str() {
                        "tenant_id" => {}
                        "asset_id" => asset_id = row.get(index)?,
                        "timestamp" => timestamp = row.get(index)?,
                        _ => {
                            let value: Option<f64> = row.get(index)?;
                            vector_values.push((column.clone(), value));
                        }
                    }
                }
                Ok((asset_id, timestamp, vector_values))
            })
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        Ok(rows
            .into_iter()
            .map(|(asset_id, timestamp, vector_values)| FeatureRow {
                asset_id: AssetId::from(asset_id),
                timestamp: Timestamp::from_unix_millis(timestamp),
                values: vector_values.into_iter().collect::<FeatureVector>(),
            })
            .collect())
    }

    fn insert_export(&self, export: &FeatureExport) -> Result<(), StoreError> {
        let asset_ids_json = to_json(&export.asset_ids)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO feature_exports (export_id, tenant_id, feature_set, start_time, \
                 end_time, asset_ids_json, row_count, file_size_bytes, storage_path, status, \
                 error_message, completed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12)",
                params![
                    export.export_id.as_str(),
                    export.tenant_id.as_str(),
                    export.feature_set,
                    export.start_time.unix_millis(),
                    export.end_time.unix_millis(),
                    asset_ids_json,
                    export.row_count as i64,
                    export.file_size_bytes as i64,
                    export.storage_path,
                    export.status.as_str(),
                    export.error_message,
                    export.completed_at.map(Timestamp::unix_millis),
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    fn list_exports(
        &self,
        tenant_id: Option<&TenantId>,
        feature_set: Option<&str>,
        status: Option<ExportStatus>,
    ) -> Result<Vec<FeatureExport>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(tenant) = tenant_id {
            clauses.push(format!("tenant_id = ?{}", values.len() + 1));
            values.push(Box::new(tenant.as_str().to_string()));
        }
        if let Some(set) = feature_set {
            clauses.push(format!("feature_set = ?{}", values.len() + 1));
            values.push(Box::new(set.to_string()));
        }
        if let Some(status) = status {
            clauses.push(format!("status = ?{}", values.len() + 1));
            values.push(Box::new(status.as_str().to_string()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let query = format!(
            "SELECT export_id, tenant_id, feature_set, start_time, end_time, asset_ids_json, \
             row_count, file_size_bytes, storage_path, status, error_message, completed_at \
             FROM feature_exports{where_clause} ORDER BY completed_at DESC"
        );
        let guard = self.lock()?;
        let mut statement = guard.prepare(&query).map_err(|err| db_err(&err))?;
        let params_ref: Vec<&dyn ToSql> = values.iter().map(AsRef::as_ref).collect();
        let rows = statement
            .query_map(params_ref.as_slice(), |row| {
                let export_id: String = row.get(0)?;
                let tenant_id: String = row.get(1)?;
                let feature_set: String = row.get(2)?;
                let start_time: i64 = row.get(3)?;
                let end_time: i64 = row.get(4)?;
                let asset_ids_json: String = row.get(5)?;
                let row_count: i64 = row.get(6)?;
                let file_size_bytes: i64 = row.get(7)?;
                let storage_path: Option<String> = row.get(8)?;
                let status: String = row.get(9)?;
                let error_message: Option<String> = row.get(10)?;
                let completed_at: Option<i64> = row.get(11)?;
                Ok((
                    export_id,
                    tenant_id,
                    feature_set,
                    start_time,
                    end_time,
                    asset_ids_json,
                    row_count,
                    file_size_bytes,
                    storage_path,
                    status,
                    error_message,
                    completed_at,
                ))
            })
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        rows.into_iter()
            .map(
                |(
                    export_id,
                    tenant_id,
                    feature_set,
                    start_time,
                    end_time,
                    asset_ids_json,
                    row_count,
                    file_size_bytes,
                    storage_path,
                    status,
                    error_message,
                    completed_at,
                )| {
                    Ok(FeatureExport {
                        export_id: ExportId::from(export_id),
                        tenant_id: TenantId::from(tenant_id),
                        feature_set,
                        start_time: Timestamp::from_unix_millis(start_time),
                        end_time: Timestamp::from_unix_millis(end_time),
                        asset_ids: from_json(&asset_ids_json)?,
                        row_count: u64::try_from(row_count).unwrap_or(0),
                        file_size_bytes: u64::try_from(file_size_bytes).unwrap_or(0),
                        storage_path,
                        status: ExportStatus::parse(&status)
                            .map_err(|err| StoreError::Invalid(err.to_string()))?,
                        error_message,
                        completed_at: completed_at.map(Timestamp::from_unix_millis),
                    })
                },
            )
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
