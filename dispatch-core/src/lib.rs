//! DISPATCH Core - Entity Types and State Machine
//!
//! Pure data structures and decision logic with no I/O. All other crates
//! depend on this. Every state transition is a function of
//! (stored record, now) so the whole machine is reproducible against
//! fixed clock fixtures.

use uuid::Uuid;

pub mod error;
pub mod lease;
pub mod settings;
pub mod token;

pub use error::{DeliveryError, StoreError, StoreResult};
pub use lease::{
    acquire_decision, is_acquirable, AcquireDecision, AcquireOutcome, LeaseRecord, LeaseStatus,
};
pub use settings::LeaseSettings;
pub use token::{
    check_resolvable, is_well_formed_token, new_link_token, validate_token_param, ResolveError,
    TokenRecord,
};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Epoch seconds. All lease and token expiry arithmetic uses this unit;
/// the HTTP boundary reads the clock exactly once per request.
pub type EpochSeconds = i64;

/// Lease holder identifier using UUIDv7 for timestamp-sortable IDs.
pub type LeaseToken = Uuid;

/// Generate a new UUIDv7 lease token (timestamp-sortable).
pub fn new_lease_token() -> LeaseToken {
    Uuid::now_v7()
}
