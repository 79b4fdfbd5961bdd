// gridmind-core/src/core/mod.rs
// ============================================================================
// Module: Gridmind Core Types
// Description: Canonical Gridmind data model structures.
// Purpose: Provide stable, serializable types for jobs, studies, runs, and features.
// Dependencies: serde, thiserror, time, uuid
// ============================================================================

//! ## Overview
//! Core types define training jobs, HPO studies, experiment runs, model
//! versions, and feature records. These types are the canonical source of
//! truth for any derived API surfaces (HTTP or CLI).

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod error;
pub mod experiment;
pub mod features;
pub mod identifiers;
pub mod job;
pub mod model;
pub mod study;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ErrorKind;
pub use error::PlatformError;
pub use experiment::Experiment;
pub use experiment::ExperimentStats;
pub use experiment::MetricPoint;
pub use experiment::MetricSummary;
pub use experiment::Run;
pub use experiment::RunStatus;
pub use features::ExportStatus;
pub use features::FeatureExport;
pub use features::FeatureRow;
pub use features::FeatureVector;
pub use features::HourlyAggregate;
pub use features::DailyAggregate;
pub use features::LagFeature;
pub use features::RollingWindow;
pub use features::WeatherObservation;
pub use features::feature_set_names;
pub use features::resolve_feature_set;
pub use identifiers::AssetId;
pub use identifiers::ExperimentId;
pub use identifiers::ExportId;
pub use identifiers::JobId;
pub use identifiers::ModelName;
pub use identifiers::RunId;
pub use identifiers::StudyName;
pub use identifiers::TenantId;
pub use identifiers::VersionId;
pub use job::HyperparameterSpec;
pub use job::HyperparameterValue;
pub use job::JobFilters;
pub use job::JobLogEntry;
pub use job::JobPage;
pub use job::JobStats;
pub use job::JobStatus;
pub use job::LogLevel;
pub use job::ModelKind;
pub use job::TrainingConfig;
pub use job::TrainingJob;
pub use job::TrainingMetrics;
pub use model::ModelStage;
pub use model::ModelVersionRef;
pub use study::best_trial;
pub use study::OptimizationHistoryPoint;
pub use study::PrunerKind;
pub use study::SamplerKind;
pub use study::Study;
pub use study::StudyDirection;
pub use study::Trial;
pub use study::TrialState;
pub use time::CalendarParts;
pub use time::Timestamp;
