// gridmind-core/src/core/identifiers.rs
// ============================================================================
// Module: Gridmind Identifiers
// Description: Canonical opaque identifiers for Gridmind entities.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Gridmind.
//! String-backed identifiers are opaque and serialize transparently; the job
//! identifier is a 128-bit UUID. Validation is handled at configuration or
//! API boundaries rather than within these simple wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Declares a transparent string-backed identifier type.
macro_rules! string_identifier {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Tenant identifier scoping all Gridmind records.
    TenantId
}

string_identifier! {
    /// Asset (meter, battery, site) identifier within a tenant.
    AssetId
}

string_identifier! {
    /// Logical model name, e.g. `forecast_lgb`.
    ModelName
}

string_identifier! {
    /// Model version string within a (tenant, name) scope.
    VersionId
}

string_identifier! {
    /// Unique HPO study name.
    StudyName
}

string_identifier! {
    /// Experiment identifier assigned by the tracker.
    ExperimentId
}

string_identifier! {
    /// Run identifier assigned by the tracker.
    RunId
}

string_identifier! {
    /// Feature export identifier.
    ExportId
}

/// Training job identifier (128-bit, opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random job identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID value.
    #[must_use]
    pub const fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a job identifier from its canonical string form.
    ///
    /// # Errors
    ///
    /// Returns [`uuid::Error`] when the input is not a valid UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(value)?))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
