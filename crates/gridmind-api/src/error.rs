// gridmind-api/src/error.rs
// ============================================================================
// Module: API Error Mapping
// Description: PlatformError to HTTP status and JSON body translation.
// Purpose: Keep transport mapping at the boundary only.
// Dependencies: gridmind-core, axum, serde
// ============================================================================

//! ## Overview
//! Core errors carry the canonical taxonomy; this module maps each kind to
//! a status code and a small JSON envelope with the kind label and the
//! short, non-sensitive message. Nothing below this layer knows about HTTP.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use gridmind_core::ErrorKind;
use gridmind_core::PlatformError;
use serde::Serialize;

// ============================================================================
// SECTION: Error Body
// ============================================================================

/// JSON error envelope returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Canonical error kind label.
    pub error: &'static str,
    /// Short, non-sensitive description.
    pub message: String,
}

/// API-layer error wrapper implementing `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub PlatformError);

impl From<PlatformError> for ApiError {
    fn from(error: PlatformError) -> Self {
        Self(error)
    }
}

/// Maps an error kind to its transport status.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Precondition => StatusCode::BAD_REQUEST,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = ErrorBody { error: kind.as_str(), message: self.0.message().to_string() };
        (status_for(kind), Json(body)).into_response()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
