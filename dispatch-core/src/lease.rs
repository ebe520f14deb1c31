//! Lease state machine for per-conversation notification dedupe.
//!
//! A conversation has no stored record until the first send attempt; absence
//! is the implicit initial state. After that, the record only ever moves
//! through `Leased`, `Sent` and `Error`, and every transition is guarded by a
//! conditional write in the store. The decision functions here are pure:
//! given the currently stored record and an explicit clock value they say
//! what the manager should do, and the store re-evaluates the same predicate
//! atomically at write time.
//!
//! # State Transition Diagram
//!
//! ```text
//! (absent) ──────── acquire ──────→ Leased ── commit ──→ Sent (terminal)
//!     ↑                               │
//!     │ lease_expires_at elapsed      └─── fail ───→ Error
//!     │ (self-healing, no write)                       │
//!     └──────── error_cooldown_until elapsed ──────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::settings::LeaseSettings;
use crate::{new_lease_token, EpochSeconds, LeaseToken};

// ============================================================================
// STATUS ENUM
// ============================================================================

/// Stored status of a conversation's lease record.
///
/// There is no `None` variant: a conversation with no record is in the
/// initial state, and records are never deleted explicitly (they age out via
/// store retention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    /// A caller holds exclusive right to attempt delivery until
    /// `lease_expires_at`.
    Leased,
    /// Terminal. Delivery succeeded; all further attempts are no-ops.
    Sent,
    /// A delivery attempt failed; further attempts are blocked until
    /// `error_cooldown_until` elapses.
    Error,
}

// ============================================================================
// LEASE RECORD
// ============================================================================

/// One record per conversation identifier, keyed by `conversation_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Opaque stable id grouping all messages of one chat session; the
    /// dedupe key.
    pub conversation_id: String,

    pub status: LeaseStatus,

    /// Identifies the holder for commit/fail conditional writes.
    pub lease_token: LeaseToken,

    /// Meaningful only while `status == Leased`.
    pub lease_expires_at: EpochSeconds,

    /// Meaningful only while `status == Error`.
    pub error_cooldown_until: EpochSeconds,

    /// Store-level retention horizon. Set far beyond the lease and cooldown
    /// windows so a human can still inspect the record after the fact.
    pub record_expiry_at: EpochSeconds,
}

impl LeaseRecord {
    /// Build a fresh `Leased` record for a grant attempt at `now`.
    pub fn acquired(
        conversation_id: impl Into<String>,
        now: EpochSeconds,
        settings: &LeaseSettings,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            status: LeaseStatus::Leased,
            lease_token: new_lease_token(),
            lease_expires_at: now + settings.lease_duration_secs,
            error_cooldown_until: 0,
            record_expiry_at: now + settings.record_retention_secs,
        }
    }

    /// The `Sent` record this lease commits into.
    pub fn committed(&self) -> Self {
        Self {
            status: LeaseStatus::Sent,
            ..self.clone()
        }
    }

    /// The `Error` record this lease fails into, blocking retries until the
    /// cooldown elapses.
    pub fn failed(&self, now: EpochSeconds, settings: &LeaseSettings) -> Self {
        Self {
            status: LeaseStatus::Error,
            error_cooldown_until: now + settings.error_cooldown_secs,
            ..self.clone()
        }
    }

    /// Whether a `Leased` record's holder has run out of time. An expired
    /// lease is treated exactly like an absent record by acquirers; this is
    /// the self-healing path after a crash between grant and commit/fail.
    pub fn is_lease_expired(&self, now: EpochSeconds) -> bool {
        self.lease_expires_at <= now
    }

    /// Whether an `Error` record's mandatory waiting period has elapsed.
    pub fn is_cooldown_elapsed(&self, now: EpochSeconds) -> bool {
        self.error_cooldown_until <= now
    }
}

// ============================================================================
// ACQUIRE DECISION
// ============================================================================

/// What the lease manager should do given the currently stored record.
///
/// `Attempt` is not a grant: the conditional write is the single source of
/// truth for exclusivity, never the read that produced this decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireDecision {
    /// The record looks acquirable; attempt the conditional write.
    Attempt,
    /// Terminal `Sent` record: the notification already went out.
    AlreadySent,
    /// An unexpired lease or an active error cooldown blocks this caller.
    Blocked,
}

/// Outcome of an acquire operation as observed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// This caller won the conditional write and must now attempt delivery,
    /// then commit or fail the carried lease.
    Granted { lease: LeaseRecord },
    /// Delivery already succeeded for this conversation.
    AlreadySent,
    /// Another holder owns the attempt. Callers treat this as success:
    /// someone is handling it, and duplicate suppression is the point.
    HeldByOther,
}

/// Classify the stored record at `now`.
pub fn acquire_decision(
    existing: Option<&LeaseRecord>,
    now: EpochSeconds,
) -> AcquireDecision {
    match existing {
        None => AcquireDecision::Attempt,
        Some(record) => match record.status {
            LeaseStatus::Sent => AcquireDecision::AlreadySent,
            LeaseStatus::Leased if record.is_lease_expired(now) => AcquireDecision::Attempt,
            LeaseStatus::Leased => AcquireDecision::Blocked,
            LeaseStatus::Error if record.is_cooldown_elapsed(now) => AcquireDecision::Attempt,
            LeaseStatus::Error => AcquireDecision::Blocked,
        },
    }
}

/// The predicate the store evaluates atomically for an acquire write:
/// absent, or `Error` with elapsed cooldown, or `Leased` with expired lease.
pub fn is_acquirable(existing: Option<&LeaseRecord>, now: EpochSeconds) -> bool {
    matches!(acquire_decision(existing, now), AcquireDecision::Attempt)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn settings() -> LeaseSettings {
        LeaseSettings {
            lease_duration_secs: 120,
            error_cooldown_secs: 300,
            record_retention_secs: 2_592_000,
            token_ttl_secs: 604_800,
        }
    }

    #[test]
    fn test_absent_record_is_acquirable() {
        assert_eq!(acquire_decision(None, 1_000), AcquireDecision::Attempt);
        assert!(is_acquirable(None, 0));
    }

    #[test]
    fn test_sent_record_is_terminal() {
        let record = LeaseRecord::acquired("conv-1", 1_000, &settings()).committed();
        assert_eq!(
            acquire_decision(Some(&record), 1_000),
            AcquireDecision::AlreadySent
        );
        // Terminal regardless of how much time passes.
        assert_eq!(
            acquire_decision(Some(&record), i64::MAX),
            AcquireDecision::AlreadySent
        );
    }

    #[test]
    fn test_unexpired_lease_blocks() {
        let record = LeaseRecord::acquired("conv-1", 1_000, &settings());
        assert_eq!(
            acquire_decision(Some(&record), 1_000),
            AcquireDecision::Blocked
        );
        assert_eq!(
            acquire_decision(Some(&record), 1_119),
            AcquireDecision::Blocked
        );
    }

    #[test]
    fn test_expired_lease_is_reacquirable() {
        // A lease granted and never committed/failed self-heals.
        let record = LeaseRecord::acquired("conv-1", 1_000, &settings());
        assert_eq!(record.lease_expires_at, 1_120);
        assert_eq!(
            acquire_decision(Some(&record), 1_120),
            AcquireDecision::Attempt
        );
        assert_eq!(
            acquire_decision(Some(&record), 5_000),
            AcquireDecision::Attempt
        );
    }

    #[test]
    fn test_error_cooldown_blocks_then_releases() {
        // Blocked strictly before the cooldown elapses, acquirable after.
        let record = LeaseRecord::acquired("conv-1", 1_000, &settings()).failed(1_050, &settings());
        assert_eq!(record.status, LeaseStatus::Error);
        assert_eq!(record.error_cooldown_until, 1_350);
        assert_eq!(
            acquire_decision(Some(&record), 1_349),
            AcquireDecision::Blocked
        );
        assert_eq!(
            acquire_decision(Some(&record), 1_350),
            AcquireDecision::Attempt
        );
    }

    #[test]
    fn test_committed_preserves_identity() {
        let leased = LeaseRecord::acquired("conv-1", 1_000, &settings());
        let sent = leased.committed();
        assert_eq!(sent.status, LeaseStatus::Sent);
        assert_eq!(sent.conversation_id, leased.conversation_id);
        assert_eq!(sent.lease_token, leased.lease_token);
        assert_eq!(sent.record_expiry_at, leased.record_expiry_at);
    }

    #[test]
    fn test_retention_outlives_lease_and_cooldown() {
        let record = LeaseRecord::acquired("conv-1", 1_000, &settings());
        assert!(record.record_expiry_at > record.lease_expires_at);
        let failed = record.failed(1_050, &settings());
        assert!(failed.record_expiry_at > failed.error_cooldown_until);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&LeaseStatus::Leased).unwrap();
        assert_eq!(json, "\"leased\"");
        let json = serde_json::to_string(&LeaseStatus::Sent).unwrap();
        assert_eq!(json, "\"sent\"");
    }

    proptest! {
        /// A Sent record never becomes acquirable, whatever the clock says.
        #[test]
        fn prop_sent_never_acquirable(now in i64::MIN..i64::MAX, granted_at in 0i64..1_000_000) {
            let record = LeaseRecord::acquired("conv-p", granted_at, &settings()).committed();
            prop_assert!(!is_acquirable(Some(&record), now));
        }

        /// A Leased record is acquirable exactly when the lease has expired.
        #[test]
        fn prop_leased_acquirable_iff_expired(granted_at in 0i64..1_000_000, delta in -500i64..500) {
            let record = LeaseRecord::acquired("conv-p", granted_at, &settings());
            let now = record.lease_expires_at + delta;
            prop_assert_eq!(is_acquirable(Some(&record), now), delta >= 0);
        }

        /// An Error record is acquirable exactly when the cooldown has elapsed.
        #[test]
        fn prop_error_acquirable_iff_cooled(granted_at in 0i64..1_000_000, delta in -500i64..500) {
            let record = LeaseRecord::acquired("conv-p", granted_at, &settings())
                .failed(granted_at + 10, &settings());
            let now = record.error_cooldown_until + delta;
            prop_assert_eq!(is_acquirable(Some(&record), now), delta >= 0);
        }
    }
}
