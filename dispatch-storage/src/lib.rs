//! DISPATCH Storage - Durable Keyed Store Contract and Implementations
//!
//! Defines the store abstraction both subsystems coordinate through. The
//! store is the only shared mutable resource in the system: it is never
//! read-then-written without a conditional guard on the write, and the
//! guard is re-evaluated atomically inside the store's per-key
//! serialization point.

pub mod lmdb;
pub mod memory;

pub use lmdb::{LmdbStore, LmdbStoreError};
pub use memory::MemoryStore;

use ::async_trait::async_trait;
use dispatch_core::{
    is_acquirable, EpochSeconds, LeaseRecord, LeaseStatus, LeaseToken, StoreResult, TokenRecord,
};

// ============================================================================
// CONDITIONAL WRITE TYPES
// ============================================================================

/// Guard for a conditional lease write.
///
/// This generalizes put-if-absent-or-status-equals: the time comparisons are
/// part of the condition so expired leases and elapsed cooldowns count as
/// acquirable without a separate cleanup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Record absent, or `Error` with elapsed cooldown, or `Leased` with an
    /// expired lease.
    Acquirable { now: EpochSeconds },
    /// Record is `Leased` and held by this specific token. Used by commit
    /// and fail transitions; lease expiry is deliberately not checked here,
    /// a slow-but-successful delivery still gets to commit as long as
    /// nobody re-acquired.
    HeldBy { lease_token: LeaseToken },
}

/// Result of a conditional write. `ConditionFailed` means another writer
/// won; it is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    ConditionFailed,
}

/// Evaluate a write condition against the currently stored record.
///
/// Both implementations call this inside their per-key atomic section, so
/// the predicate semantics live in exactly one place.
pub fn condition_holds(existing: Option<&LeaseRecord>, condition: &WriteCondition) -> bool {
    match condition {
        WriteCondition::Acquirable { now } => is_acquirable(existing, *now),
        WriteCondition::HeldBy { lease_token } => matches!(
            existing,
            Some(record)
                if record.status == LeaseStatus::Leased && record.lease_token == *lease_token
        ),
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable keyed store for lease and token records.
///
/// Implementations must make `lease_put_conditional` atomic and
/// linearizable per key: of N concurrent writers with the same guard,
/// exactly one observes `Applied`. Record expiry is eventual: callers
/// performing logical expiry checks must never rely on the store having
/// already reclaimed a record.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Get the lease record for a conversation, expired or not.
    async fn lease_get(&self, conversation_id: &str) -> StoreResult<Option<LeaseRecord>>;

    /// Write a lease record only if `condition` holds against the currently
    /// stored state.
    async fn lease_put_conditional(
        &self,
        record: &LeaseRecord,
        condition: WriteCondition,
    ) -> StoreResult<WriteOutcome>;

    /// Get a token record, expired or not.
    async fn token_get(&self, token: &str) -> StoreResult<Option<TokenRecord>>;

    /// Store an issued token record. Tokens are write-once; issuance is not
    /// concurrency-sensitive.
    async fn token_put(&self, record: &TokenRecord) -> StoreResult<()>;

    /// Physically reclaim records whose retention horizon has passed.
    /// Returns the number of records removed.
    async fn sweep_expired(&self, now: EpochSeconds) -> StoreResult<u64>;

    /// Whether the backend is reachable and usable.
    async fn health_check(&self) -> StoreResult<bool>;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::LeaseSettings;

    #[test]
    fn test_condition_holds_acquirable() {
        let settings = LeaseSettings::default();
        assert!(condition_holds(None, &WriteCondition::Acquirable { now: 0 }));

        let leased = LeaseRecord::acquired("conv-1", 1_000, &settings);
        assert!(!condition_holds(
            Some(&leased),
            &WriteCondition::Acquirable { now: 1_000 }
        ));
        assert!(condition_holds(
            Some(&leased),
            &WriteCondition::Acquirable {
                now: leased.lease_expires_at
            }
        ));

        let sent = leased.committed();
        assert!(!condition_holds(
            Some(&sent),
            &WriteCondition::Acquirable { now: i64::MAX }
        ));
    }

    #[test]
    fn test_condition_holds_held_by() {
        let settings = LeaseSettings::default();
        let leased = LeaseRecord::acquired("conv-1", 1_000, &settings);

        // Holds for the recorded holder, with no expiry check: a slow but
        // successful delivery still gets to commit.
        assert!(condition_holds(
            Some(&leased),
            &WriteCondition::HeldBy {
                lease_token: leased.lease_token
            }
        ));
        assert!(!condition_holds(
            Some(&leased),
            &WriteCondition::HeldBy {
                lease_token: dispatch_core::new_lease_token()
            }
        ));

        let sent = leased.committed();
        assert!(!condition_holds(
            Some(&sent),
            &WriteCondition::HeldBy {
                lease_token: sent.lease_token
            }
        ));
        assert!(!condition_holds(
            None,
            &WriteCondition::HeldBy {
                lease_token: dispatch_core::new_lease_token()
            }
        ));
    }
}
