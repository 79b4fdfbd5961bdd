// gridmind-core/src/core/error.rs
// ============================================================================
// Module: Gridmind Error Taxonomy
// Description: Platform-wide error kinds shared across all components.
// Purpose: Provide one typed error sum mapped to transport codes at the edge.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every component surfaces failures as a [`PlatformError`] carrying one of
//! the canonical kinds. Module-local error enums convert into this type at
//! crate boundaries; HTTP status mapping happens only in the API crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Canonical error classification.
///
/// # Invariants
/// - Variants are stable for serialization and transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; never retried automatically.
    Validation,
    /// Referenced entity is absent.
    NotFound,
    /// State machine or uniqueness violation.
    Conflict,
    /// Guarded operation rejected (e.g. delete production without force).
    Precondition,
    /// Transient backend failure (database, object store, cache).
    Unavailable,
    /// A stage or solver exceeded its budget.
    Timeout,
    /// Unanticipated failure; logged, never swallowed.
    Internal,
}

impl ErrorKind {
    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Precondition => "precondition",
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

// ============================================================================
// SECTION: Platform Error
// ============================================================================

/// Platform-wide typed error.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Referenced entity is absent.
    #[error("not found: {0}")]
    NotFound(String),
    /// State machine or uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Guarded operation rejected.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// Transient backend failure.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Budget exceeded.
    #[error("timeout: {0}")]
    Timeout(String),
    /// Unanticipated failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Returns the canonical kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the short, non-sensitive description.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Precondition(message)
            | Self::Unavailable(message)
            | Self::Timeout(message)
            | Self::Internal(message) => message,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
