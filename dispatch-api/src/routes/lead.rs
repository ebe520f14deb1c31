//! Lead REST API Routes
//!
//! Axum route handlers for the "send lead" boundary. All three benign
//! outcomes return a success-shaped response so the widget never retries
//! needlessly; only validation failures and genuine infrastructure failures
//! surface as errors.

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use dispatch_core::LeaseSettings;
use dispatch_storage::KeyedStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    delivery::DeliveryPipeline,
    error::ApiResult,
    services::{send_lead, LeadOutcome, LeadRequest},
    validation::ValidateNonEmpty,
};

// ============================================================================
// SHARED STATE
// ============================================================================

/// Shared application state for lead routes.
#[derive(Clone)]
pub struct LeadState {
    pub store: Arc<dyn KeyedStore>,
    pub delivery: Arc<dyn DeliveryPipeline>,
    pub settings: LeaseSettings,
}

impl LeadState {
    pub fn new(
        store: Arc<dyn KeyedStore>,
        delivery: Arc<dyn DeliveryPipeline>,
        settings: LeaseSettings,
    ) -> Self {
        Self {
            store,
            delivery,
            settings,
        }
    }
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// Wire label for the send outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadOutcomeLabel {
    Delivered,
    AlreadyHandled,
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadResponse {
    pub ok: bool,
    pub outcome: LeadOutcomeLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_link_token: Option<String>,
}

impl From<LeadOutcome> for LeadResponse {
    fn from(outcome: LeadOutcome) -> Self {
        match outcome {
            LeadOutcome::Delivered { text_link_token } => Self {
                ok: true,
                outcome: LeadOutcomeLabel::Delivered,
                text_link_token,
            },
            LeadOutcome::AlreadyHandled => Self {
                ok: true,
                outcome: LeadOutcomeLabel::AlreadyHandled,
                text_link_token: None,
            },
            LeadOutcome::Deferred => Self {
                ok: true,
                outcome: LeadOutcomeLabel::Deferred,
                text_link_token: None,
            },
        }
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/leads/notify - Attempt the lead notification for a conversation
pub async fn notify_lead(
    State(state): State<Arc<LeadState>>,
    Json(req): Json<LeadRequest>,
) -> ApiResult<impl IntoResponse> {
    req.conversation_id.validate_non_empty("conversation_id")?;
    req.reason.validate_non_empty("reason")?;
    req.summary.validate_non_empty("summary")?;

    let now = Utc::now().timestamp();
    let outcome = send_lead(
        state.store.as_ref(),
        state.delivery.as_ref(),
        &state.settings,
        &req,
        now,
    )
    .await?;

    Ok(Json(LeadResponse::from(outcome)))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the lead routes router.
pub fn create_router(
    store: Arc<dyn KeyedStore>,
    delivery: Arc<dyn DeliveryPipeline>,
    settings: LeaseSettings,
) -> axum::Router {
    let state = Arc::new(LeadState::new(store, delivery, settings));

    axum::Router::new()
        .route("/notify", axum::routing::post(notify_lead))
        .with_state(state)
}
