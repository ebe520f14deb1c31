//! Error Types for the DISPATCH API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.
//! Benign lease conflicts never surface here: duplicate-attempt suppression
//! is a correctness feature and is reported as a success-shaped outcome by
//! the lead routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_core::{DeliveryError, ResolveError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code. The wire form is
/// snake_case, matching what the widget and link pages key their copy on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // ========================================================================
    // Token lifecycle errors (400, 404, 410)
    // ========================================================================
    /// No `token` query parameter, or an empty one
    MissingToken,

    /// Token parameter is not a canonical UUID
    InvalidToken,

    /// Token is well-formed but unknown
    NotFound,

    /// Token existed but its validity window lapsed
    Expired,

    // ========================================================================
    // Validation errors (400)
    // ========================================================================
    /// Required field is missing from request
    MissingField,

    /// Request contains invalid input data
    InvalidInput,

    // ========================================================================
    // Authentication errors (401)
    // ========================================================================
    /// Admin credential absent or wrong
    Unauthorized,

    // ========================================================================
    // Infrastructure errors (502, 503, 500)
    // ========================================================================
    /// Downstream notification send failed; the lease entered its cooldown
    DeliveryFailed,

    /// Durable store hiccup; safe for the caller to retry with backoff
    StoreUnavailable,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingToken
            | ErrorCode::InvalidToken
            | ErrorCode::MissingField
            | ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,

            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Expired => StatusCode::GONE,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::DeliveryFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::MissingToken => "Missing token parameter",
            ErrorCode::InvalidToken => "Invalid token format",
            ErrorCode::NotFound => "Not found",
            ErrorCode::Expired => "This link has expired",
            ErrorCode::MissingField => "Required field is missing",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::DeliveryFailed => "Notification delivery failed",
            ErrorCode::StoreUnavailable => "Service temporarily unavailable",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn missing_token() -> Self {
        Self::from_code(ErrorCode::MissingToken)
    }

    pub fn invalid_token() -> Self {
        Self::from_code(ErrorCode::InvalidToken)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn expired() -> Self {
        Self::from_code(ErrorCode::Expired)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn delivery_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeliveryFailed, message)
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreUnavailable, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

/// Implement IntoResponse for ApiError to enable automatic error handling
/// in Axum handlers.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM CORE ERRORS
// ============================================================================

/// Convert from StoreError to ApiError.
///
/// The full error is logged; the client only learns the operation is
/// retryable, never store internals.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store error");
        ApiError::store_unavailable("Store operation failed, retry shortly")
    }
}

/// Convert from DeliveryError to ApiError.
impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        tracing::error!(error = %err, "Delivery error");
        ApiError::delivery_failed("Notification delivery failed")
    }
}

/// Convert from token ResolveError to ApiError.
impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingToken => ApiError::missing_token(),
            ResolveError::InvalidToken => ApiError::invalid_token(),
            ResolveError::NotFound => ApiError::not_found("Unknown token"),
            ResolveError::Expired => ApiError::expired(),
        }
    }
}

/// Convert from a lead send failure to ApiError.
impl From<crate::services::LeadSendError> for ApiError {
    fn from(err: crate::services::LeadSendError) -> Self {
        match err {
            crate::services::LeadSendError::Store(e) => ApiError::from(e),
            crate::services::LeadSendError::Delivery(e) => ApiError::from(e),
        }
    }
}

/// Convert from a token resolve failure to ApiError.
impl From<crate::services::ResolveFailure> for ApiError {
    fn from(err: crate::services::ResolveFailure) -> Self {
        match err {
            crate::services::ResolveFailure::Resolve(e) => ApiError::from(e),
            crate::services::ResolveFailure::Store(e) => ApiError::from(e),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
