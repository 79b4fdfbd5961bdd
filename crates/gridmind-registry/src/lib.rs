// gridmind-registry/src/lib.rs
// ============================================================================
// Module: Gridmind Registry Library
// Description: Versioned model artifact registry over the object store.
// Purpose: Expose the registry operations and sidecar documents.
// Dependencies: crate::{metadata, registry}
// ============================================================================

//! ## Overview
//! The registry keeps one immutable artifact plus metadata and metric
//! sidecars per (tenant, name, version) under the object-store key layout
//! `tenant/name/version/{model.bin, metadata.json, metrics.json}`. Stage
//! transitions rewrite only the metadata sidecar.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod metadata;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use metadata::ModelMetadata;
pub use metadata::artifact_key;
pub use metadata::metadata_key;
pub use metadata::metrics_key;
pub use metadata::version_prefix;
pub use registry::ModelRecord;
pub use registry::ModelRegistry;
pub use registry::RegisterRequest;
