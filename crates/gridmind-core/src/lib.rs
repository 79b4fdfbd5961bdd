// gridmind-core/src/lib.rs
// ============================================================================
// Module: Gridmind Core Library
// Description: Public API surface for the Gridmind training core.
// Purpose: Expose canonical types, interfaces, and the error taxonomy.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Gridmind core provides the canonical data model for training jobs, HPO
//! studies, experiments, model versions, and feature records, plus the
//! backend-agnostic interfaces the other crates implement. It is
//! storage-agnostic and integrates through explicit interfaces rather than
//! embedding into any particular backend.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CacheError;
pub use interfaces::CancelFlag;
pub use interfaces::Event;
pub use interfaces::EventSink;
pub use interfaces::ExecutionContext;
pub use interfaces::ExecutionOutcome;
pub use interfaces::Executor;
pub use interfaces::ExperimentStore;
pub use interfaces::FeatureCache;
pub use interfaces::FeatureRepository;
pub use interfaces::JobStore;
pub use interfaces::Model;
pub use interfaces::ModelCodecError;
pub use interfaces::ModelEnvelope;
pub use interfaces::ObjectListing;
pub use interfaces::ObjectStore;
pub use interfaces::ObjectStoreError;
pub use interfaces::ProgressSink;
pub use interfaces::StoreError;
pub use interfaces::StudyStore;
