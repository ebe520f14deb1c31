//! Business logic for DISPATCH operations, kept free of HTTP concerns so the
//! route handlers stay thin and the properties are testable against fixed
//! clock values.

pub mod lease_service;
pub mod token_service;

pub use lease_service::{
    acquire_lease, commit_lease, fail_lease, send_lead, LeadOutcome, LeadRequest, LeadSendError,
};
pub use token_service::{resolve_token, ResolveFailure};
