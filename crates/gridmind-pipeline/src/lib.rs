// gridmind-pipeline/src/lib.rs
// ============================================================================
// Module: Gridmind Pipeline Library
// Description: Deterministic five-stage training pipeline and validator.
// Purpose: Expose the executor, datasets, concrete models, and validation.
// Dependencies: crate::{dataset, loader, models, pipeline, validate}
// ============================================================================

//! ## Overview
//! The pipeline executes load, preprocess, fit, evaluate, and register as
//! strictly ordered stages with progress milestones at 0.20, 0.40, 0.70,
//! 0.85, and 1.00. All randomness derives from the configuration seed; two
//! runs with identical inputs produce bit-identical predictions. The
//! validator grades a trained model with five independent checks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dataset;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dataset::Dataset;
pub use dataset::SplitDataset;
pub use dataset::StandardScaler;
pub use loader::load_training_frame;
pub use models::AnomalyDetector;
pub use models::GbtParams;
pub use models::GbtRegressor;
pub use models::decode_model;
pub use models::extract_hyperparameters;
pub use pipeline::DISTRIBUTED_ROW_THRESHOLD;
pub use pipeline::TrainingPipeline;
pub use pipeline::evaluate_forecast;
pub use pipeline::evaluate_anomaly;
pub use pipeline::use_distributed;
pub use validate::FeatureStats;
pub use validate::ModelValidator;
pub use validate::ValidationReport;
