//! Admin REST API Routes
//!
//! Operational inspection of lease records, guarded by a static bearer
//! credential. This is deliberately simple: the admin surface is internal
//! and read-only, not part of the public core.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use dispatch_storage::KeyedStore;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for admin routes.
#[derive(Clone)]
pub struct AdminState {
    pub store: Arc<dyn KeyedStore>,
    /// When unset, every admin request is rejected.
    pub admin_token: Option<String>,
}

impl AdminState {
    pub fn new(store: Arc<dyn KeyedStore>, admin_token: Option<String>) -> Self {
        Self { store, admin_token }
    }
}

// ============================================================================
// AUTHORIZATION
// ============================================================================

fn authorize_admin(expected: &Option<String>, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = expected else {
        return Err(ApiError::unauthorized("Admin endpoints are disabled"));
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == expected => Ok(()),
        _ => Err(ApiError::unauthorized("Invalid admin credential")),
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/admin/leases/:conversation_id - Inspect a lease record
pub async fn get_lease(
    State(state): State<Arc<AdminState>>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    authorize_admin(&state.admin_token, &headers)?;

    let record = state
        .store
        .lease_get(&conversation_id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("No lease record for {}", conversation_id))
        })?;

    Ok(Json(record))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the admin routes router.
pub fn create_router(store: Arc<dyn KeyedStore>, admin_token: Option<String>) -> axum::Router {
    let state = Arc::new(AdminState::new(store, admin_token));

    axum::Router::new()
        .route(
            "/leases/:conversation_id",
            axum::routing::get(get_lease),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_authorize_rejects_when_disabled() {
        let err = authorize_admin(&None, &headers_with_bearer("anything")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Unauthorized);
    }

    #[test]
    fn test_authorize_checks_credential() {
        let expected = Some("s3cret".to_string());

        assert!(authorize_admin(&expected, &headers_with_bearer("s3cret")).is_ok());
        assert!(authorize_admin(&expected, &headers_with_bearer("wrong")).is_err());
        assert!(authorize_admin(&expected, &HeaderMap::new()).is_err());
    }
}
