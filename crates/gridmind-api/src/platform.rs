// gridmind-api/src/platform.rs
// ============================================================================
// Module: Platform Composition
// Description: One-shot wiring of every Gridmind component.
// Purpose: Replace ambient singletons with an explicit composition root.
// Dependencies: all gridmind crates
// ============================================================================

//! ## Overview
//! The platform is constructed once at startup and threaded explicitly
//! through handlers. Construction order makes teardown explicit: the
//! orchestrator owns every spawned task and is shut down first; storage
//! handles drop last.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use gridmind_config::GridmindConfig;
use gridmind_core::EventSink;
use gridmind_core::PlatformError;
use gridmind_features::FeatureStore;
use gridmind_features::build_cache;
use gridmind_hpo::StudyEngine;
use gridmind_object_store::build_object_store;
use gridmind_orchestrator::Orchestrator;
use gridmind_pipeline::TrainingPipeline;
use gridmind_registry::ModelRegistry;
use gridmind_store_sqlite::SqliteStore;
use gridmind_tracking::ExperimentTracker;

// ============================================================================
// SECTION: Platform
// ============================================================================

/// Root composition object for the training core.
pub struct Platform {
    /// Loaded configuration.
    pub config: GridmindConfig,
    /// Durable relational store.
    pub store: SqliteStore,
    /// Job orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Model registry.
    pub registry: Arc<ModelRegistry>,
    /// Feature store.
    pub features: Arc<FeatureStore>,
    /// Experiment tracker.
    pub tracker: Arc<ExperimentTracker>,
    /// HPO study engine.
    pub hpo: Arc<StudyEngine>,
}

impl Platform {
    /// Builds the platform from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unavailable`] when a backing service cannot
    /// be reached or initialized.
    pub fn build(
        config: GridmindConfig,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, PlatformError> {
        let store = SqliteStore::open(&config.store)
            .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
        let object_store = build_object_store(&config.object_store)?;
        let cache = build_cache(&config.cache)
            .map_err(|err| PlatformError::Unavailable(err.to_string()))?;
        let registry = Arc::new(ModelRegistry::new(object_store));
        let tracker = Arc::new(ExperimentTracker::new(
            Arc::new(store.clone()),
            config.tracking.artifact_root.clone(),
        ));
        let hpo = Arc::new(StudyEngine::new(Arc::new(store.clone())));
        let features = Arc::new(FeatureStore::new(
            cache,
            Arc::new(store.clone()),
            Arc::clone(&events),
            config.cache.ttl_seconds,
            config.features.export_dir.clone(),
        ));
        let pipeline = Arc::new(TrainingPipeline::new(
            Arc::new(store.clone()),
            Arc::clone(&registry),
            Arc::clone(&tracker),
            Arc::clone(&hpo),
        ));
        let orchestrator = Orchestrator::new(
            Arc::new(store.clone()),
            pipeline,
            config.orchestrator.clone(),
            events,
        );
        Ok(Self { config, store, orchestrator, registry, features, tracker, hpo })
    }

    /// Starts the dispatch loop.
    pub fn start(&self) {
        self.orchestrator.start();
    }

    /// Stops the dispatch loop and every owned execution task.
    pub fn shutdown(&self) {
        self.orchestrator.shutdown();
    }
}
