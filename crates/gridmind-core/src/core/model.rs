// gridmind-core/src/core/model.rs
// ============================================================================
// Module: Gridmind Model Lifecycle
// Description: Model version references and stage lifecycle markers.
// Purpose: Provide the registry-facing model vocabulary shared across crates.
// Dependencies: crate::core::{error, identifiers}, serde
// ============================================================================

//! ## Overview
//! A model version is identified by (tenant, name, version) and moves
//! through the `staging` / `production` / `archived` lifecycle. The registry
//! owns the sidecar documents; this module only carries the shared
//! vocabulary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::PlatformError;
use crate::core::identifiers::ModelName;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::VersionId;

// ============================================================================
// SECTION: Stage
// ============================================================================

/// Lifecycle stage of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStage {
    /// Candidate awaiting promotion.
    Staging,
    /// Actively served version; at most one per (tenant, name).
    Production,
    /// Retired version.
    Archived,
}

impl ModelStage {
    /// Returns the stable label for the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Archived => "archived",
        }
    }

    /// Parses a stable label back into a stage.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, PlatformError> {
        match label {
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            "archived" => Ok(Self::Archived),
            other => Err(PlatformError::Validation(format!("unknown model stage: {other}"))),
        }
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Version Reference
// ============================================================================

/// Fully qualified model version reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelVersionRef {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Logical model name.
    pub model_name: ModelName,
    /// Version string.
    pub version: VersionId,
}

impl ModelVersionRef {
    /// Builds a reference from its parts.
    #[must_use]
    pub const fn new(tenant_id: TenantId, model_name: ModelName, version: VersionId) -> Self {
        Self { tenant_id, model_name, version }
    }

    /// Returns the canonical `tenant:name:version` identifier.
    #[must_use]
    pub fn model_id(&self) -> String {
        format!("{}:{}:{}", self.tenant_id, self.model_name, self.version)
    }

    /// Parses a canonical `tenant:name:version` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Validation`] when the identifier does not
    /// have exactly three non-empty segments.
    pub fn parse(model_id: &str) -> Result<Self, PlatformError> {
        let mut parts = model_id.splitn(3, ':');
        let (Some(tenant), Some(name), Some(version)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(PlatformError::Validation(format!("invalid model id: {model_id}")));
        };
        if tenant.is_empty() || name.is_empty() || version.is_empty() {
            return Err(PlatformError::Validation(format!("invalid model id: {model_id}")));
        }
        Ok(Self {
            tenant_id: TenantId::from(tenant),
            model_name: ModelName::from(name),
            version: VersionId::from(version),
        })
    }
}

impl fmt::Display for ModelVersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.model_id())
    }
}
