//! Link token records and validation.
//!
//! A token is an opaque, unguessable identifier exchanged for a private
//! contact payload within a bounded validity window. Tokens are issued at
//! send time to power "text customer" links in the notification, and stay
//! re-resolvable until expiry (resolution never mutates the record).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::EpochSeconds;

// ============================================================================
// TOKEN FORMAT
// ============================================================================

/// Canonical 36-character hyphenated UUID shape (8-4-4-4-12 hex groups).
/// Anything else is rejected before any store lookup, both as a cheap guard
/// and so malformed and unknown tokens take indistinguishable time.
static TOKEN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("token shape regex is valid")
});

/// Generate a new link token (UUIDv4, canonical hyphenated form).
///
/// Tokens are random rather than timestamp-sortable: unguessability is the
/// whole point, the resolver endpoint is public and unauthenticated.
pub fn new_link_token() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `raw` has the canonical token shape.
pub fn is_well_formed_token(raw: &str) -> bool {
    TOKEN_SHAPE.is_match(raw)
}

// ============================================================================
// TOKEN RECORD
// ============================================================================

/// One record per issued link token, keyed by `token`.
///
/// Read-only after creation; reclaimed by store retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Canonical hyphenated UUID string, generated by the issuer.
    pub token: String,

    /// Private contact string (visitor phone number). Never exposed except
    /// through a successful resolve.
    pub destination: String,

    /// Prefilled message text associated with the token.
    pub body: String,

    /// Logical expiry. Checked against `now` on every resolve, independent
    /// of whether the store has physically reclaimed the record yet.
    pub record_expiry_at: EpochSeconds,
}

impl TokenRecord {
    pub fn is_expired(&self, now: EpochSeconds) -> bool {
        now >= self.record_expiry_at
    }
}

// ============================================================================
// RESOLUTION FAILURES
// ============================================================================

/// Classified resolution failures, in the order they are checked.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// No `token` parameter, or an empty one.
    #[error("Missing token parameter")]
    MissingToken,

    /// Parameter present but not the canonical UUID shape.
    #[error("Invalid token format")]
    InvalidToken,

    /// Well-formed but unknown. Deliberately not distinguished from
    /// never-existed states beyond what expiry already reveals.
    #[error("Token not found")]
    NotFound,

    /// The link did exist but its validity window lapsed. Surfaced
    /// distinctly because it is operationally useful in support
    /// conversations.
    #[error("Token expired")]
    Expired,
}

/// Validate the raw `token` query parameter before any store access.
pub fn validate_token_param(raw: Option<&str>) -> Result<&str, ResolveError> {
    let raw = match raw {
        None => return Err(ResolveError::MissingToken),
        Some(value) if value.is_empty() => return Err(ResolveError::MissingToken),
        Some(value) => value,
    };
    if !is_well_formed_token(raw) {
        return Err(ResolveError::InvalidToken);
    }
    Ok(raw)
}

/// Classify a looked-up record at `now`: the payload if resolvable,
/// `NotFound` on a store miss, `Expired` once the window lapsed.
pub fn check_resolvable(
    record: Option<TokenRecord>,
    now: EpochSeconds,
) -> Result<TokenRecord, ResolveError> {
    match record {
        None => Err(ResolveError::NotFound),
        Some(record) if record.is_expired(now) => Err(ResolveError::Expired),
        Some(record) => Ok(record),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(record_expiry_at: EpochSeconds) -> TokenRecord {
        TokenRecord {
            token: "11111111-2222-4333-8444-555555555555".to_string(),
            destination: "+14081234567".to_string(),
            body: "Hello from test".to_string(),
            record_expiry_at,
        }
    }

    #[test]
    fn test_generated_tokens_are_well_formed() {
        for _ in 0..32 {
            let token = new_link_token();
            assert_eq!(token.len(), 36);
            assert!(is_well_formed_token(&token));
        }
    }

    #[test]
    fn test_token_shape_rejects_deviations() {
        assert!(is_well_formed_token("11111111-2222-4333-8444-555555555555"));
        assert!(is_well_formed_token("AAAAAAAA-BBBB-4CCC-8DDD-EEEEFFFF0000"));

        assert!(!is_well_formed_token("abc"));
        assert!(!is_well_formed_token(""));
        // Simple (unhyphenated) UUID form is not canonical.
        assert!(!is_well_formed_token("11111111222243338444555555555555"));
        // Wrong group widths.
        assert!(!is_well_formed_token("1111111-2222-4333-8444-555555555555"));
        // Non-hex characters.
        assert!(!is_well_formed_token("11111111-2222-4333-8444-55555555555g"));
        // Trailing garbage.
        assert!(!is_well_formed_token(
            "11111111-2222-4333-8444-555555555555x"
        ));
    }

    #[test]
    fn test_validate_token_param() {
        // Absent and empty map to MissingToken, malformed to InvalidToken.
        assert_eq!(validate_token_param(None), Err(ResolveError::MissingToken));
        assert_eq!(
            validate_token_param(Some("")),
            Err(ResolveError::MissingToken)
        );
        assert_eq!(
            validate_token_param(Some("abc")),
            Err(ResolveError::InvalidToken)
        );
        assert_eq!(
            validate_token_param(Some("11111111-2222-4333-8444-555555555555")),
            Ok("11111111-2222-4333-8444-555555555555")
        );
    }

    #[test]
    fn test_check_resolvable_miss_and_expiry() {
        assert_eq!(check_resolvable(None, 100), Err(ResolveError::NotFound));

        // Expiry at 100 observed at 200 is gone; the boundary itself is
        // expired too.
        let record = sample_record(100);
        assert_eq!(
            check_resolvable(Some(record.clone()), 200),
            Err(ResolveError::Expired)
        );
        assert_eq!(
            check_resolvable(Some(record), 100),
            Err(ResolveError::Expired)
        );
    }

    #[test]
    fn test_check_resolvable_returns_payload_unchanged() {
        // A live record resolves to the stored payload verbatim.
        let record = sample_record(5_000);
        let resolved = check_resolvable(Some(record.clone()), 100).unwrap();
        assert_eq!(resolved.destination, "+14081234567");
        assert_eq!(resolved.body, "Hello from test");
        assert_eq!(resolved, record);
    }
}
