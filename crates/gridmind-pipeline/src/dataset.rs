// gridmind-pipeline/src/dataset.rs
// ============================================================================
// Module: Training Datasets
// Description: Time-ordered frames, splits, and feature scaling.
// Purpose: Provide the preprocess-stage primitives with leakage guarantees.
// Dependencies: gridmind-core, serde
// ============================================================================

//! ## Overview
//! Datasets hold time-sorted rows. The split carves the tail `test_split`
//! fraction first, then the tail `validation_split / (1 - test_split)`
//! fraction of the remainder as validation, never shuffling. The scaler is
//! fit on the training slice only and applied to validation and test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gridmind_core::PlatformError;
use gridmind_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Dataset
// ============================================================================

/// Time-sorted training frame.
///
/// # Invariants
/// - `timestamps`, `rows`, and `targets` share one length.
/// - `timestamps` are non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature column names, in row order.
    pub feature_names: Vec<String>,
    /// Row timestamps (non-decreasing).
    pub timestamps: Vec<Timestamp>,
    /// Feature rows.
    pub rows: Vec<Vec<f64>>,
    /// Target values.
    pub targets: Vec<f64>,
}

impl Dataset {
    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the frame holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Splits the frame into time-ordered train/validation/test slices and
    /// scales features with a scaler fit on the training slice only.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] when the frame is too small to
    /// yield a non-empty training slice.
    pub fn split_and_scale(
        &self,
        validation_split: f64,
        test_split: f64,
    ) -> Result<SplitDataset, PlatformError> {
        let n = self.len();
        let test_len = fraction_len(n, test_split);
        let remainder = n - test_len;
        let validation_fraction =
            if test_split >= 1.0 { 0.0 } else { validation_split / (1.0 - test_split) };
        let validation_len = fraction_len(remainder, validation_fraction);
        let train_len = remainder - validation_len;
        if train_len == 0 {
            return Err(PlatformError::Validation(
                "dataset too small for the requested splits".to_string(),
            ));
        }
        let scaler = StandardScaler::fit(&self.rows[.. train_len]);
        let slice = |range: std::ops::Range<usize>| SplitSlice {
            timestamps: self.timestamps[range.clone()].to_vec(),
            rows: self.rows[range.clone()].iter().map(|row| scaler.transform_row(row)).collect(),
            targets: self.targets[range].to_vec(),
        };
        Ok(SplitDataset {
            feature_names: self.feature_names.clone(),
            train: slice(0 .. train_len),
            validation: slice(train_len .. remainder),
            test: slice(remainder .. n),
            scaler,
        })
    }
}

/// Floor of `n * fraction`, clamped into [0, n].
fn fraction_len(n: usize, fraction: f64) -> usize {
    let scaled = (n as f64 * fraction.clamp(0.0, 1.0)).floor();
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "The value is floored, non-negative, and clamped into [0, n] below."
    )]
    let len = scaled.max(0.0) as usize;
    len.min(n)
}

// ============================================================================
// SECTION: Split Result
// ============================================================================

/// One scaled slice of a split dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SplitSlice {
    /// Row timestamps.
    pub timestamps: Vec<Timestamp>,
    /// Scaled feature rows.
    pub rows: Vec<Vec<f64>>,
    /// Target values.
    pub targets: Vec<f64>,
}

impl SplitSlice {
    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the slice holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Time-ordered split with a train-fit scaler.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDataset {
    /// Feature column names.
    pub feature_names: Vec<String>,
    /// Training slice (earliest rows).
    pub train: SplitSlice,
    /// Validation slice.
    pub validation: SplitSlice,
    /// Test slice (latest rows).
    pub test: SplitSlice,
    /// Scaler fit on the training slice only.
    pub scaler: StandardScaler,
}

// ============================================================================
// SECTION: Scaler
// ============================================================================

/// Standard-score feature scaler.
///
/// # Invariants
/// - Fit statistics come from the training slice only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-column means.
    pub means: Vec<f64>,
    /// Per-column standard deviations (zero replaced by one).
    pub stds: Vec<f64>,
}

impl StandardScaler {
    /// Fits column statistics over the given rows.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let columns = rows.first().map_or(0, Vec::len);
        if rows.is_empty() {
            return Self { means: vec![0.0; columns], stds: vec![1.0; columns] };
        }
        let mut means = vec![0.0; columns];
        for row in rows {
            for (index, value) in row.iter().enumerate() {
                means[index] += value;
            }
        }
        for mean in &mut means {
            *mean /= rows.len() as f64;
        }
        let mut stds = vec![0.0; columns];
        for row in rows {
            for (index, value) in row.iter().enumerate() {
                stds[index] += (value - means[index]).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / rows.len() as f64).sqrt();
            if *std == 0.0 {
                *std = 1.0;
            }
        }
        Self { means, stds }
    }

    /// Scales one row.
    #[must_use]
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(index, value)| {
                let mean = self.means.get(index).copied().unwrap_or(0.0);
                let std = self.stds.get(index).copied().unwrap_or(1.0);
                (value - mean) / std
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
