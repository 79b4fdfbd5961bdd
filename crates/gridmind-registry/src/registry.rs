// gridmind-registry/src/registry.rs
// ============================================================================
// Module: Model Registry
// Description: Register, list, promote, copy, and delete model versions.
// Purpose: Own the version lifecycle over the object-store gateway.
// Dependencies: gridmind-core, serde_json, sha2
// ============================================================================

//! ## Overview
//! Registration is three writes: artifact, metadata, optional metrics.
//! Sidecar reads translate absent objects into empty sentinels so
//! aggregations degrade gracefully. Promotion is a metadata read-modify-
//! write; promoting to production demotes the previous production version
//! of the same (tenant, name) to archived. Copy reads the source metadata,
//! duplicates every key, then writes the target metadata derived from the
//! source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use gridmind_core::ModelStage;
use gridmind_core::ModelVersionRef;
use gridmind_core::ObjectStore;
use gridmind_core::ObjectStoreError;
use gridmind_core::PlatformError;
use gridmind_core::Timestamp;
use gridmind_core::VersionId;
use sha2::Digest;
use sha2::Sha256;

use crate::metadata::ModelMetadata;
use crate::metadata::artifact_key;
use crate::metadata::metadata_key;
use crate::metadata::metrics_key;
use crate::metadata::version_prefix;

// ============================================================================
// SECTION: Requests / Records
// ============================================================================

/// Inputs for registering one model version.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// Fully qualified version reference.
    pub reference: ModelVersionRef,
    /// Serialized artifact bytes (tagged envelope).
    pub artifact: Vec<u8>,
    /// Hint naming the concrete trained-model kind.
    pub model_type: String,
    /// Free-form user metadata fields.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optional metrics document.
    pub metrics: Option<BTreeMap<String, f64>>,
}

/// One version as returned by `get`: metadata plus metric sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    /// Metadata sidecar.
    pub metadata: ModelMetadata,
    /// Metrics sidecar; empty when the sidecar is absent.
    pub metrics: BTreeMap<String, f64>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Versioned, content-addressed model repository.
pub struct ModelRegistry {
    /// Object-store gateway.
    store: Arc<dyn ObjectStore>,
}

impl ModelRegistry {
    /// Creates a registry over the given object store.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Registers a new version: artifact, metadata, and optional metrics.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Conflict`] when the version already exists
    /// and [`PlatformError::Unavailable`] on backend failures.
    pub fn register(&self, request: RegisterRequest) -> Result<ModelMetadata, PlatformError> {
        let reference = &request.reference;
        if self.store.get(&metadata_key(reference)).is_ok() {
            return Err(PlatformError::Conflict(format!(
                "model version already exists: {reference}"
            )));
        }
        let digest = Sha256::digest(&request.artifact);
        let metadata = ModelMetadata {
            tenant_id: reference.tenant_id.to_string(),
            model_name: reference.model_name.to_string(),
            version: reference.version.to_string(),
            uploaded_at: Timestamp::now(),
            model_size_bytes: request.artifact.len() as u64,
            model_type: request.model_type,
            stage: ModelStage::Staging,
            artifact_sha256: format!("{digest:x}"),
            copied_from: None,
            copied_at: None,
            promotion_reason: None,
            extra: request.metadata,
        };
        self.store
            .put(&artifact_key(reference), request.artifact, Some("application/octet-stream"))?;
        self.write_metadata(reference, &metadata)?;
        if let Some(metrics) = &request.metrics {
            let bytes = serde_json::to_vec(metrics)
                .map_err(|err| PlatformError::Internal(err.to_string()))?;
            self.store.put(&metrics_key(reference), bytes, Some("application/json"))?;
        }
        Ok(metadata)
    }

    /// Loads metadata and metrics for a version.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unavailable`] on backend failures; an
    /// absent version yields `Ok(None)`.
    pub fn get(&self, reference: &ModelVersionRef) -> Result<Option<ModelRecord>, PlatformError> {
        let Some(metadata) = self.read_metadata(reference)? else {
            return Ok(None);
        };
        Ok(Some(ModelRecord { metadata, metrics: self.get_metrics(reference)? }))
    }

    /// Downloads the artifact bytes for a version.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the artifact is absent.
    pub fn get_artifact(&self, reference: &ModelVersionRef) -> Result<Vec<u8>, PlatformError> {
        Ok(self.store.get(&artifact_key(reference))?)
    }

    /// Loads the metrics sidecar, returning the empty sentinel when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unavailable`] on backend failures.
    pub fn get_metrics(
        &self,
        reference: &ModelVersionRef,
    ) -> Result<BTreeMap<String, f64>, PlatformError> {
        match self.store.get(&metrics_key(reference)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| PlatformError::Internal(err.to_string())),
            Err(ObjectStoreError::NotFound(_)) => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists all versions of (tenant, name), newest upload first.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unavailable`] on backend failures.
    pub fn list_versions(
        &self,
        tenant_id: &str,
        model_name: &str,
    ) -> Result<Vec<ModelMetadata>, PlatformError> {
        let prefix = format!("{tenant_id}/{model_name}/");
        let listing = self.store.list(&prefix, Some('/'))?;
        let mut versions = Vec::with_capacity(listing.common_prefixes.len());
        for version_prefix in listing.common_prefixes {
            let version = version_prefix
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string();
            let reference = ModelVersionRef::new(
                tenant_id.into(),
                model_name.into(),
                VersionId::from(version),
            );
            if let Some(metadata) = self.read_metadata(&reference)? {
                versions.push(metadata);
            }
        }
        versions.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(versions)
    }

    /// Promotes a version to the target stage, demoting any previous
    /// production version of the same model when the target is production.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the version is absent.
    pub fn promote(
        &self,
        reference: &ModelVersionRef,
        target_stage: ModelStage,
        reason: Option<String>,
    ) -> Result<ModelMetadata, PlatformError> {
        let Some(mut metadata) = self.read_metadata(reference)? else {
            return Err(PlatformError::NotFound(format!("model version not found: {reference}")));
        };
        if target_stage == ModelStage::Production {
            self.demote_current_production(reference)?;
        }
        metadata.stage = target_stage;
        metadata.promotion_reason = reason;
        self.write_metadata(reference, &metadata)?;
        Ok(metadata)
    }

    /// Deletes every object of a version; production requires `force`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Precondition`] for unforced production
    /// deletes and [`PlatformError::NotFound`] for absent versions.
    pub fn delete(
        &self,
        reference: &ModelVersionRef,
        force: bool,
    ) -> Result<Vec<String>, PlatformError> {
        let Some(metadata) = self.read_metadata(reference)? else {
            return Err(PlatformError::NotFound(format!("model version not found: {reference}")));
        };
        if metadata.stage == ModelStage::Production && !force {
            return Err(PlatformError::Precondition(format!(
                "refusing to delete production version {reference} without force"
            )));
        }
        Ok(self.store.delete_prefix(&version_prefix(reference))?)
    }

    /// Copies a version to a new version string, duplicating all sidecars
    /// and rewriting the target metadata with copy provenance.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] when the source is absent and
    /// [`PlatformError::Conflict`] when the target already exists.
    pub fn copy(
        &self,
        source: &ModelVersionRef,
        target_version: &VersionId,
    ) -> Result<ModelMetadata, PlatformError> {
        let Some(source_metadata) = self.read_metadata(source)? else {
            return Err(PlatformError::NotFound(format!("model version not found: {source}")));
        };
        let target = ModelVersionRef::new(
            source.tenant_id.clone(),
            source.model_name.clone(),
            target_version.clone(),
        );
        if self.read_metadata(&target)?.is_some() {
            return Err(PlatformError::Conflict(format!(
                "model version already exists: {target}"
            )));
        }
        let source_prefix = version_prefix(source);
        let target_prefix = version_prefix(&target);
        for key in self.store.list(&source_prefix, None)?.keys {
            let Some(relative) = key.strip_prefix(&source_prefix) else { continue };
            self.store.copy(&key, &format!("{target_prefix}{relative}"))?;
        }
        let mut metadata = source_metadata;
        metadata.version = target_version.to_string();
        metadata.copied_from = Some(source.version.to_string());
        metadata.copied_at = Some(Timestamp::now());
        self.write_metadata(&target, &metadata)?;
        Ok(metadata)
    }

    /// Reads the metadata sidecar, returning `None` when absent.
    fn read_metadata(
        &self,
        reference: &ModelVersionRef,
    ) -> Result<Option<ModelMetadata>, PlatformError> {
        match self.store.get(&metadata_key(reference)) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|err| PlatformError::Internal(err.to_string())),
            Err(ObjectStoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the metadata sidecar.
    fn write_metadata(
        &self,
        reference: &ModelVersionRef,
        metadata: &ModelMetadata,
    ) -> Result<(), PlatformError> {
        let bytes =
            serde_json::to_vec(metadata).map_err(|err| PlatformError::Internal(err.to_string()))?;
        self.store.put(&metadata_key(reference), bytes, Some("application/json"))?;
        Ok(())
    }

    /// Archives the current production version of the same model, if any.
    fn demote_current_production(
        &self,
        promoting: &ModelVersionRef,
    ) -> Result<(), PlatformError> {
        let versions =
            self.list_versions(promoting.tenant_id.as_str(), promoting.model_name.as_str())?;
        for mut metadata in versions {
            if metadata.stage == ModelStage::Production && metadata.version != promoting.version.as_str()
            {
                let reference = metadata.reference();
                metadata.stage = ModelStage::Archived;
                self.write_metadata(&reference, &metadata)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
