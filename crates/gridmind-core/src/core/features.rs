// gridmind-core/src/core/features.rs
// ============================================================================
// Module: Gridmind Feature Records
// Description: Feature vectors, aggregates, and export metadata.
// Purpose: Provide the feature-store vocabulary shared across crates.
// Dependencies: crate::core::{error, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Feature vectors map named scalars for one (tenant, asset, timestamp).
//! Named feature sets project the vector for a model family; unknown names
//! fall back to the full vector at the call site. Exports record bulk dumps
//! to columnar files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::PlatformError;
use crate::core::identifiers::AssetId;
use crate::core::identifiers::ExportId;
use crate::core::identifiers::TenantId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Feature Vector
// ============================================================================

/// Named scalar features for one lookup; absent tiers leave `None` values
/// or missing keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    /// Feature name to value.
    values: BTreeMap<String, Option<f64>>,
}

impl FeatureVector {
    /// Creates an empty vector.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: BTreeMap::new() }
    }

    /// Inserts or replaces a feature value.
    pub fn set(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.insert(name.into(), value);
    }

    /// Returns a feature value when present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.values.get(name).copied()
    }

    /// Returns the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no features are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Merges another vector into this one, overwriting collisions.
    pub fn extend(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Projects the vector onto the requested names, dropping the rest.
    #[must_use]
    pub fn project(&self, names: &[&str]) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        Self { values }
    }
}

impl FromIterator<(String, Option<f64>)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, Option<f64>)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

// ============================================================================
// SECTION: Feature Sets
// ============================================================================

/// Names of the built-in feature sets.
#[must_use]
pub const fn feature_set_names() -> &'static [&'static str] {
    &["forecast_basic", "forecast_advanced", "anomaly_detection"]
}

/// Resolves a feature-set name to its projection, or `None` for unknown
/// names (callers fall back to the full vector).
#[must_use]
pub fn resolve_feature_set(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "forecast_basic" => Some(&[
            "hour_of_day",
            "day_of_week",
            "is_weekend",
            "hourly_avg",
            "lag_1h",
            "lag_24h",
        ]),
        "forecast_advanced" => Some(&[
            "hour_of_day",
            "day_of_week",
            "day_of_month",
            "month",
            "is_weekend",
            "hourly_avg",
            "hourly_std",
            "lag_1h",
            "lag_24h",
            "lag_168h",
            "temperature",
            "humidity",
            "solar_irradiance",
        ]),
        "anomaly_detection" => Some(&[
            "hour_of_day",
            "day_of_week",
            "hourly_avg",
            "hourly_std",
            "hourly_min",
            "hourly_max",
            "lag_1h",
        ]),
        _ => None,
    }
}

// ============================================================================
// SECTION: Aggregates
// ============================================================================

/// Hourly continuous-aggregate row for one asset bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyAggregate {
    /// Mean over the bucket.
    pub avg: f64,
    /// Standard deviation over the bucket.
    pub std: f64,
    /// Minimum over the bucket.
    pub min: f64,
    /// Maximum over the bucket.
    pub max: f64,
    /// Median over the bucket.
    pub median: f64,
    /// Coefficient of variation over the bucket.
    pub cv: f64,
}

/// Daily continuous-aggregate row for one asset bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Mean over the bucket.
    pub avg: f64,
    /// Standard deviation over the bucket.
    pub std: f64,
    /// Minimum over the bucket.
    pub min: f64,
    /// Maximum over the bucket.
    pub max: f64,
}

/// One lag observation returned by the lag-feature query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagFeature {
    /// Lag distance in hours.
    pub lag_hours: u32,
    /// Observed value at the lagged hour, when present.
    pub value: Option<f64>,
}

/// Rolling-window statistics for one asset and window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    /// Mean over the window.
    pub avg: f64,
    /// Standard deviation over the window.
    pub std: f64,
    /// Minimum over the window.
    pub min: f64,
    /// Maximum over the window.
    pub max: f64,
    /// Median over the window.
    pub median: f64,
    /// Observation count in the window.
    pub count: u64,
}

/// Most-recent weather observation at or before a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Air temperature.
    pub temperature: Option<f64>,
    /// Relative humidity.
    pub humidity: Option<f64>,
    /// Wind speed.
    pub wind_speed: Option<f64>,
    /// Solar irradiance.
    pub solar_irradiance: Option<f64>,
    /// Cloud cover fraction.
    pub cloud_cover: Option<f64>,
    /// Precipitation.
    pub precipitation: Option<f64>,
}

// ============================================================================
// SECTION: Feature Rows
// ============================================================================

/// One materialized feature row used by exports and the Load stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Asset the row belongs to.
    pub asset_id: AssetId,
    /// Row timestamp.
    pub timestamp: Timestamp,
    /// Feature columns.
    pub values: FeatureVector,
}

// ============================================================================
// SECTION: Exports
// ============================================================================

/// Terminal status of a feature export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Rows were written to the columnar file.
    Completed,
    /// The query window was empty; no file was created.
    NoData,
    /// The export failed; `error_message` carries the cause.
    Failed,
}

impl ExportStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NoData => "no_data",
            Self::Failed => "failed",
        }
    }

    /// Parses a stable label back into a status.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "completed" => Ok(Self::Completed),
            "no_data" => Ok(Self::NoData),
            "failed" => Ok(Self::Failed),
            other => Err(PlatformError::Validation(format!("unknown export status: {other}"))),
        }
    }
}

/// Durable record of one bulk feature dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureExport {
    /// Export identifier.
    pub export_id: ExportId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Exported feature set.
    pub feature_set: String,
    /// Window start.
    pub start_time: Timestamp,
    /// Window end.
    pub end_time: Timestamp,
    /// Optional asset filter.
    pub asset_ids: Vec<AssetId>,
    /// Rows written.
    pub row_count: u64,
    /// Bytes written.
    pub file_size_bytes: u64,
    /// Output path for completed exports.
    pub storage_path: Option<String>,
    /// Terminal status.
    pub status: ExportStatus,
    /// Failure cause for failed exports.
    pub error_message: Option<String>,
    /// Completion time.
    pub completed_at: Option<Timestamp>,
}
