// gridmind-registry/src/metadata.rs
// ============================================================================
// Module: Registry Metadata
// Description: Metadata sidecar document and object-key derivation.
// Purpose: Define the durable metadata shape and the key layout.
// Dependencies: gridmind-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every registered version carries a metadata document with the required
//! registry fields plus arbitrary user fields. The document is the only
//! mutable object under a version prefix; `stage` transitions rewrite it in
//! place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use gridmind_core::ModelStage;
use gridmind_core::ModelVersionRef;
use gridmind_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Key Layout
// ============================================================================

/// Artifact file name under a version prefix.
const ARTIFACT_FILE: &str = "model.bin";
/// Metadata sidecar file name.
const METADATA_FILE: &str = "metadata.json";
/// Metrics sidecar file name.
const METRICS_FILE: &str = "metrics.json";

/// Returns the prefix holding every object of one version.
#[must_use]
pub fn version_prefix(reference: &ModelVersionRef) -> String {
    format!(
        "{}/{}/{}/",
        reference.tenant_id, reference.model_name, reference.version
    )
}

/// Returns the artifact key for a version.
#[must_use]
pub fn artifact_key(reference: &ModelVersionRef) -> String {
    format!("{}{ARTIFACT_FILE}", version_prefix(reference))
}

/// Returns the metadata sidecar key for a version.
#[must_use]
pub fn metadata_key(reference: &ModelVersionRef) -> String {
    format!("{}{METADATA_FILE}", version_prefix(reference))
}

/// Returns the metrics sidecar key for a version.
#[must_use]
pub fn metrics_key(reference: &ModelVersionRef) -> String {
    format!("{}{METRICS_FILE}", version_prefix(reference))
}

// ============================================================================
// SECTION: Metadata Document
// ============================================================================

/// Metadata sidecar for one model version.
///
/// # Invariants
/// - Required fields are always present; user fields flatten alongside them.
/// - `stage` is the only field rewritten after registration (plus the copy
///   provenance fields written by `copy`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Owning tenant.
    pub tenant_id: String,
    /// Logical model name.
    pub model_name: String,
    /// Version string.
    pub version: String,
    /// Upload time.
    pub uploaded_at: Timestamp,
    /// Artifact size in bytes.
    pub model_size_bytes: u64,
    /// Hint naming the concrete trained-model kind.
    pub model_type: String,
    /// Lifecycle stage.
    pub stage: ModelStage,
    /// SHA-256 digest of the artifact bytes.
    pub artifact_sha256: String,
    /// Source version when this version was produced by `copy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copied_from: Option<String>,
    /// Copy time when this version was produced by `copy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copied_at: Option<Timestamp>,
    /// Reason recorded by the latest promotion, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_reason: Option<String>,
    /// Free-form user fields.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelMetadata {
    /// Returns the fully qualified version reference for this document.
    #[must_use]
    pub fn reference(&self) -> ModelVersionRef {
        ModelVersionRef::new(
            self.tenant_id.as_str().into(),
            self.model_name.as_str().into(),
            self.version.as_str().into(),
        )
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
