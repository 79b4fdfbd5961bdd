// gridmind-object-store/src/keys.rs
// ============================================================================
// Module: Object Key Validation
// Description: Key and prefix validation for the object-store gateway.
// Purpose: Reject traversal, absolute, and oversized keys before any backend call.
// Dependencies: gridmind-core
// ============================================================================

//! ## Overview
//! Object keys are caller-derived (`tenant/name/version/...`) and must be
//! validated before they reach a backend. Storage is untrusted; keys are
//! bounded in total length and per segment, relative, and free of traversal
//! components.

// ============================================================================
// SECTION: Imports
// ============================================================================

use gridmind_core::ObjectStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
const MAX_KEY_SEGMENT_LENGTH: usize = 255;
/// Maximum total key length.
const MAX_TOTAL_KEY_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an object key.
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] for empty, absolute, oversized, or
/// traversal-bearing keys.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() {
        return Err(ObjectStoreError::Invalid("key must be set".to_string()));
    }
    if key.len() > MAX_TOTAL_KEY_LENGTH {
        return Err(ObjectStoreError::Invalid("key exceeds length limit".to_string()));
    }
    if key.starts_with('/') {
        return Err(ObjectStoreError::Invalid("key must be relative".to_string()));
    }
    if key.contains('\\') {
        return Err(ObjectStoreError::Invalid("key must not contain backslashes".to_string()));
    }
    for segment in key.split('/') {
        validate_segment(segment)?;
    }
    Ok(())
}

/// Validates a key prefix (a trailing slash and an empty prefix are allowed).
///
/// # Errors
///
/// Returns [`ObjectStoreError::Invalid`] for malformed prefixes.
pub fn validate_prefix(prefix: &str) -> Result<(), ObjectStoreError> {
    if prefix.is_empty() {
        return Ok(());
    }
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if trimmed.is_empty() {
        return Err(ObjectStoreError::Invalid("prefix must name at least one segment".to_string()));
    }
    validate_key(trimmed)
}

/// Validates a single key segment.
fn validate_segment(segment: &str) -> Result<(), ObjectStoreError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ObjectStoreError::Invalid("key segment is invalid".to_string()));
    }
    if segment.len() > MAX_KEY_SEGMENT_LENGTH {
        return Err(ObjectStoreError::Invalid("key segment exceeds length limit".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
