//! DISPATCH API - REST API Layer
//!
//! This crate provides the HTTP boundary for the DISPATCH lead-notification
//! core: the lease-managed "send lead" endpoint, the public token resolver
//! behind "text customer" links, admin lease inspection, and health checks.
//!
//! All coordination state lives in the durable keyed store; handlers are
//! stateless and read the clock exactly once per request.

pub mod config;
pub mod delivery;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod services;
pub mod validation;

// Re-export commonly used types
pub use config::{AppConfig, StoreBackend};
pub use delivery::{DeliveryPipeline, HttpDelivery, LeadNotification, RecordingDelivery};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use jobs::{RetentionSweeper, RetentionSweeperConfig};
pub use routes::create_api_router;
pub use services::{
    acquire_lease, commit_lease, fail_lease, resolve_token, send_lead, LeadOutcome, LeadRequest,
    LeadSendError, ResolveFailure,
};
