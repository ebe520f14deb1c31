//! Token Resolver REST API Routes
//!
//! Public, unauthenticated `GET` endpoint exchanging a link token for its
//! private contact payload. Unguessability of the token is the access
//! control; everything else is validation and expiry.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use dispatch_storage::KeyedStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{error::ApiResult, services::resolve_token};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for token routes.
#[derive(Clone)]
pub struct TokenState {
    pub store: Arc<dyn KeyedStore>,
}

impl TokenState {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self { store }
    }
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveTokenQuery {
    /// Absent and empty both classify as `missing_token`.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveTokenResponse {
    pub ok: bool,
    /// Private destination (visitor phone number).
    pub to: String,
    /// Prefilled message text.
    pub body: String,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/tokens/resolve?token=… - Resolve a "text customer" link token
pub async fn resolve(
    State(state): State<Arc<TokenState>>,
    Query(query): Query<ResolveTokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now().timestamp();
    let record = resolve_token(state.store.as_ref(), query.token.as_deref(), now).await?;

    Ok(Json(ResolveTokenResponse {
        ok: true,
        to: record.destination,
        body: record.body,
    }))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the token routes router.
pub fn create_router(store: Arc<dyn KeyedStore>) -> axum::Router {
    let state = Arc::new(TokenState::new(store));

    axum::Router::new()
        .route("/resolve", axum::routing::get(resolve))
        .with_state(state)
}
