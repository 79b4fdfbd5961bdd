// gridmind-pipeline/src/models.rs
// ============================================================================
// Module: Trained Models
// Description: Concrete model implementations behind the capability trait.
// Purpose: Provide one trainable model per model kind with a tagged codec.
// Dependencies: gridmind-core, rand, serde, serde_json
// ============================================================================

//! ## Overview
//! Two concrete models back the pipeline: a seeded gradient-boosted
//! regression-tree ensemble for forecasting and a per-feature z-score
//! detector for anomaly scoring. Both serialize through the tagged model
//! envelope; callers only ever see the capability trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::HyperparameterValue;
use gridmind_core::Model;
use gridmind_core::ModelCodecError;
use gridmind_core::ModelEnvelope;
use gridmind_core::ModelKind;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Envelope format version written by this crate.
const ENVELOPE_FORMAT_VERSION: u32 = 1;
/// Minimum rows in a tree leaf.
const MIN_SAMPLES_LEAF: usize = 5;
/// Candidate split thresholds examined per feature.
const SPLIT_CANDIDATES: usize = 16;
/// Z-score threshold flagging an anomaly.
pub(crate) const ANOMALY_Z_THRESHOLD: f64 = 3.0;

// ============================================================================
// SECTION: Hyperparameters
// ============================================================================

/// Concrete gradient-boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbtParams {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    /// Shrinkage applied to each tree.
    pub learning_rate: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Row subsampling fraction per tree.
    pub subsample: f64,
}

impl Default for GbtParams {
    fn default() -> Self {
        Self { n_estimators: 100, learning_rate: 0.1, max_depth: 5, subsample: 0.8 }
    }
}

/// Extracts concrete hyperparameters from a configuration map.
///
/// Search-space descriptors are ignored; the model default applies for
/// those keys. Concrete scalars override defaults.
#[must_use]
pub fn extract_hyperparameters(
    configured: &BTreeMap<String, HyperparameterValue>,
) -> GbtParams {
    let mut params = GbtParams::default();
    for (key, value) in configured {
        let Some(scalar) = value.as_scalar() else { continue };
        match key.as_str() {
            "n_estimators" => {
                if let Some(value) = scalar.as_u64() {
                    params.n_estimators = usize::try_from(value).unwrap_or(params.n_estimators);
                }
            }
            "learning_rate" => {
                if let Some(value) = scalar.as_f64() {
                    params.learning_rate = value;
                }
            }
            "max_depth" => {
                if let Some(value) = scalar.as_u64() {
                    params.max_depth = usize::try_from(value).unwrap_or(params.max_depth);
                }
            }
            "subsample" => {
                if let Some(value) = scalar.as_f64() {
                    params.subsample = value.clamp(0.1, 1.0);
                }
            }
            _ => {}
        }
    }
    params
}

// ============================================================================
// SECTION: Regression Trees
// ============================================================================

/// One node of a regression tree stored in arena form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    /// Internal split.
    Split {
        /// Feature index tested.
        feature: usize,
        /// Threshold; rows with `value <= threshold` go left.
        threshold: f64,
        /// Left child index.
        left: usize,
        /// Right child index.
        right: usize,
    },
    /// Terminal value.
    Leaf {
        /// Predicted residual.
        value: f64,
    },
}

/// Arena-allocated regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    /// Node arena; index 0 is the root.
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Predicts the residual for one row.
    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split { feature, threshold, left, right } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Fits a tree on the indexed rows against residual targets.
    fn fit(
        rows: &[Vec<f64>],
        residuals: &[f64],
        indices: &[usize],
        max_depth: usize,
    ) -> Self {
        let mut nodes = Vec::new();
        build_node(rows, residuals, indices, max_depth, &mut nodes);
        Self { nodes }
    }
}

/// Recursively builds one node, returning its arena index.
fn build_node(
    rows: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    depth: usize,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let mean = slice_mean(residuals, indices);
    if depth == 0 || indices.len() < 2 * MIN_SAMPLES_LEAF {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    }
    let Some((feature, threshold)) = best_split(rows, residuals, indices) else {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    };
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&index| rows[index][feature] <= threshold);
    if left_rows.len() < MIN_SAMPLES_LEAF || right_rows.len() < MIN_SAMPLES_LEAF {
        nodes.push(TreeNode::Leaf { value: mean });
        return nodes.len() - 1;
    }
    let slot = nodes.len();
    nodes.push(TreeNode::Leaf { value: mean });
    let left = build_node(rows, residuals, &left_rows, depth - 1, nodes);
    let right = build_node(rows, residuals, &right_rows, depth - 1, nodes);
    nodes[slot] = TreeNode::Split { feature, threshold, left, right };
    slot
}

/// Finds the (feature, threshold) pair minimizing the split SSE.
fn best_split(rows: &[Vec<f64>], residuals: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let columns = rows.first().map_or(0, Vec::len);
    let parent_sse = slice_sse(residuals, indices);
    let mut best: Option<(usize, f64, f64)> = None;
    for feature in 0 .. columns {
        let mut values: Vec<f64> = indices.iter().map(|&index| rows[index][feature]).collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        if values.len() < 2 {
            continue;
        }
        let stride = (values.len() / SPLIT_CANDIDATES).max(1);
        for pair in values.windows(2).step_by(stride) {
            let threshold = f64::midpoint(pair[0], pair[1]);
            let (left, right): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&index| rows[index][feature] <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let sse = slice_sse(residuals, &left) + slice_sse(residuals, &right);
            if sse < parent_sse && best.as_ref().is_none_or(|(_, _, incumbent)| sse < *incumbent)
            {
                best = Some((feature, threshold, sse));
            }
        }
    }
    best.map(|(feature, threshold, _)| (feature, threshold))
}

/// Mean of the selected residuals.
fn slice_mean(residuals: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&index| residuals[index]).sum::<f64>() / indices.len() as f64
}

/// Sum of squared errors of the selected residuals around their mean.
fn slice_sse(residuals: &[f64], indices: &[usize]) -> f64 {
    let mean = slice_mean(residuals, indices);
    indices.iter().map(|&index| (residuals[index] - mean).powi(2)).sum()
}

// ============================================================================
// SECTION: Forecast Model
// ============================================================================

/// Gradient-boosted regression-tree forecaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbtRegressor {
    /// Base prediction (training-target mean).
    base: f64,
    /// Boosted trees in fit order.
    trees: Vec<RegressionTree>,
    /// Shrinkage applied to each tree.
    learning_rate: f64,
    /// Number of input features.
    feature_count: usize,
}

impl GbtRegressor {
    /// Fits the ensemble on scaled rows; all randomness derives from `seed`.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &GbtParams, seed: u64) -> Self {
        let feature_count = rows.first().map_or(0, Vec::len);
        let base = if targets.is_empty() {
            0.0
        } else {
            targets.iter().sum::<f64>() / targets.len() as f64
        };
        let mut model = Self { base, trees: Vec::new(), learning_rate: params.learning_rate, feature_count };
        if rows.is_empty() {
            return model;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut predictions = vec![base; rows.len()];
        for _ in 0 .. params.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(target, prediction)| target - prediction)
                .collect();
            let indices: Vec<usize> = if params.subsample < 1.0 {
                (0 .. rows.len())
                    .filter(|_| rng.r#gen::<f64>() < params.subsample)
                    .collect()
            } else {
                (0 .. rows.len()).collect()
            };
            let indices = if indices.is_empty() { (0 .. rows.len()).collect() } else { indices };
            let tree = RegressionTree::fit(rows, &residuals, &indices, params.max_depth);
            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += params.learning_rate * tree.predict(row);
            }
            model.trees.push(tree);
        }
        model
    }
}

impl Model for GbtRegressor {
    fn kind(&self) -> ModelKind {
        ModelKind::Forecast
    }

    fn feature_count(&self) -> usize {
        self.feature_count
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.predict(row))
                    .sum::<f64>()
                    .mul_add(self.learning_rate, self.base)
            })
            .collect()
    }

    fn score(&self, rows: &[Vec<f64>], targets: &[f64]) -> Option<f64> {
        if targets.is_empty() {
            return None;
        }
        let predictions = self.predict(rows);
        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        let total: f64 = targets.iter().map(|target| (target - mean).powi(2)).sum();
        if total == 0.0 {
            return None;
        }
        let residual: f64 = targets
            .iter()
            .zip(&predictions)
            .map(|(target, prediction)| (target - prediction).powi(2))
            .sum();
        Some(1.0 - residual / total)
    }

    fn to_envelope(&self) -> Result<ModelEnvelope, ModelCodecError> {
        let payload =
            serde_json::to_vec(self).map_err(|err| ModelCodecError::Encode(err.to_string()))?;
        Ok(ModelEnvelope {
            kind: ModelKind::Forecast,
            format_version: ENVELOPE_FORMAT_VERSION,
            payload,
        })
    }
}

// ============================================================================
// SECTION: Anomaly Model
// ============================================================================

/// Per-feature z-score anomaly detector.
///
/// Predictions are the maximum absolute z-score across features; callers
/// binarize at [`ANOMALY_Z_THRESHOLD`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDetector {
    /// Per-feature means from training data.
    means: Vec<f64>,
    /// Per-feature standard deviations (zero replaced by one).
    stds: Vec<f64>,
}

impl AnomalyDetector {
    /// Fits per-feature statistics on the training rows.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let scaler = crate::dataset::StandardScaler::fit(rows);
        Self { means: scaler.means, stds: scaler.stds }
    }
}

impl Model for AnomalyDetector {
    fn kind(&self) -> ModelKind {
        ModelKind::Anomaly
    }

    fn feature_count(&self) -> usize {
        self.means.len()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(index, value)| {
                        let mean = self.means.get(index).copied().unwrap_or(0.0);
                        let std = self.stds.get(index).copied().unwrap_or(1.0);
                        ((value - mean) / std).abs()
                    })
                    .fold(0.0, f64::max)
            })
            .collect()
    }

    fn score(&self, _rows: &[Vec<f64>], _targets: &[f64]) -> Option<f64> {
        None
    }

    fn to_envelope(&self) -> Result<ModelEnvelope, ModelCodecError> {
        let payload =
            serde_json::to_vec(self).map_err(|err| ModelCodecError::Encode(err.to_string()))?;
        Ok(ModelEnvelope {
            kind: ModelKind::Anomaly,
            format_version: ENVELOPE_FORMAT_VERSION,
            payload,
        })
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Decodes an envelope back into its concrete model.
///
/// # Errors
///
/// Returns [`ModelCodecError`] for unsupported versions or malformed
/// payloads.
pub fn decode_model(envelope: &ModelEnvelope) -> Result<Box<dyn Model>, ModelCodecError> {
    if envelope.format_version != ENVELOPE_FORMAT_VERSION {
        return Err(ModelCodecError::Envelope(format!(
            "unsupported envelope version: {}",
            envelope.format_version
        )));
    }
    match envelope.kind {
        ModelKind::Forecast => {
            let model: GbtRegressor = serde_json::from_slice(&envelope.payload)
                .map_err(|err| ModelCodecError::Decode(err.to_string()))?;
            Ok(Box::new(model))
        }
        ModelKind::Anomaly => {
            let model: AnomalyDetector = serde_json::from_slice(&envelope.payload)
                .map_err(|err| ModelCodecError::Decode(err.to_string()))?;
            Ok(Box::new(model))
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
