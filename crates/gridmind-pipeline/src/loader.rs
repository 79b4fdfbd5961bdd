// gridmind-pipeline/src/loader.rs
// ============================================================================
// Module: Training Frame Loader
// Description: Load-stage access to materialized features.
// Purpose: Build the time-sorted training frame for one configuration.
// Dependencies: gridmind-core, rand
// ============================================================================

//! ## Overview
//! The loader reads the feature view backing the configured feature set and
//! assembles a time-sorted frame of feature rows plus the target column.
//! When the window holds no ingested measurements it synthesizes a
//! deterministic hourly dataset from the configuration seed so training
//! stays exercisable on empty deployments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gridmind_core::FeatureRepository;
use gridmind_core::PlatformError;
use gridmind_core::TenantId;
use gridmind_core::Timestamp;
use gridmind_core::TrainingConfig;
use gridmind_core::resolve_feature_set;
use gridmind_core::time::MILLIS_PER_HOUR;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::dataset::Dataset;

// ============================================================================
// SECTION: View Mapping
// ============================================================================

/// Maps a feature-set name to its backing view; unknown names fall back to
/// the basic forecast view.
fn view_for_feature_set(feature_set: &str) -> &'static str {
    match feature_set {
        "anomaly_detection" => "anomaly_detection_features",
        _ => "forecast_basic_features",
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads the training frame for a configuration.
///
/// # Errors
///
/// Returns [`PlatformError`] when the feature query fails.
pub fn load_training_frame(
    features: &dyn FeatureRepository,
    tenant_id: &TenantId,
    config: &TrainingConfig,
) -> Result<Dataset, PlatformError> {
    // Unknown feature-set names degrade to the full basic view.
    let _ = resolve_feature_set(&config.feature_set);
    let view = view_for_feature_set(&config.feature_set);
    let rows =
        features.feature_rows(view, tenant_id, config.start_date, config.end_date, &[])?;
    let mut frame = rows_to_dataset(&rows, &config.target_column);
    if frame.is_empty() {
        frame = synthesize_frame(config);
    }
    Ok(frame)
}

/// Converts materialized feature rows into a time-sorted frame.
fn rows_to_dataset(rows: &[gridmind_core::FeatureRow], target_column: &str) -> Dataset {
    let mut feature_names: Vec<String> = Vec::new();
    if let Some(first) = rows.first() {
        feature_names =
            first.values.iter().map(|(name, _)| name.to_string()).filter(|name| name != target_column).collect();
    }
    let mut indexed: Vec<(Timestamp, Vec<f64>, f64)> = rows
        .iter()
        .filter_map(|row| {
            let target = row.values.get(target_column)??;
            let features = feature_names
                .iter()
                .map(|name| row.values.get(name).flatten().unwrap_or(0.0))
                .collect();
            Some((row.timestamp, features, target))
        })
        .collect();
    indexed.sort_by_key(|(timestamp, _, _)| *timestamp);
    let mut dataset = Dataset {
        feature_names,
        timestamps: Vec::with_capacity(indexed.len()),
        rows: Vec::with_capacity(indexed.len()),
        targets: Vec::with_capacity(indexed.len()),
    };
    for (timestamp, features, target) in indexed {
        dataset.timestamps.push(timestamp);
        dataset.rows.push(features);
        dataset.targets.push(target);
    }
    dataset
}

// ============================================================================
// SECTION: Synthetic Frame
// ============================================================================

/// Feature columns of the synthesized frame.
const SYNTHETIC_COLUMNS: &[&str] = &[
    "hour_of_day",
    "day_of_week",
    "month",
    "is_weekend",
    "hourly_avg",
    "daily_avg",
    "temperature",
    "humidity",
    "lag_24h",
    "rolling_avg_24h",
];

/// Synthesizes a deterministic hourly frame over the configured window.
fn synthesize_frame(config: &TrainingConfig) -> Dataset {
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut dataset = Dataset {
        feature_names: SYNTHETIC_COLUMNS.iter().map(ToString::to_string).collect(),
        timestamps: Vec::new(),
        rows: Vec::new(),
        targets: Vec::new(),
    };
    let mut at = config.start_date.hour_bucket();
    while at <= config.end_date {
        let calendar = at.calendar();
        let hourly_avg = normal(&mut rng, 100.0, 20.0);
        let daily_avg = normal(&mut rng, 100.0, 15.0);
        let temperature = normal(&mut rng, 20.0, 5.0);
        let humidity = normal(&mut rng, 60.0, 10.0);
        let lag_24h = normal(&mut rng, 100.0, 20.0);
        let rolling_avg_24h = normal(&mut rng, 100.0, 15.0);
        let target = 0.3_f64.mul_add(
            hourly_avg,
            0.2_f64.mul_add(temperature, (-0.1_f64).mul_add(humidity, 50.0)),
        ) + normal(&mut rng, 0.0, 10.0);
        dataset.timestamps.push(at);
        dataset.rows.push(vec![
            f64::from(calendar.hour_of_day),
            f64::from(calendar.day_of_week),
            f64::from(calendar.month),
            if calendar.is_weekend { 1.0 } else { 0.0 },
            hourly_avg,
            daily_avg,
            temperature,
            humidity,
            lag_24h,
            rolling_avg_24h,
        ]);
        dataset.targets.push(target);
        at = Timestamp::from_unix_millis(at.unix_millis() + MILLIS_PER_HOUR);
    }
    dataset
}

/// Box-Muller normal draw.
fn normal(rng: &mut StdRng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE .. 1.0);
    let u2: f64 = rng.gen_range(0.0 .. 1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    z.mul_add(std, mean)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
