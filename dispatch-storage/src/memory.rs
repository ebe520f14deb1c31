//! In-memory store for tests and single-process development.
//!
//! Conditional writes take the write lock for the whole evaluate-then-write
//! section, which gives the same per-key linearizability the contract
//! demands of durable backends.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dispatch_core::{EpochSeconds, LeaseRecord, StoreError, StoreResult, TokenRecord};

use crate::{condition_holds, KeyedStore, WriteCondition, WriteOutcome};

/// In-memory keyed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    leases: Arc<RwLock<HashMap<String, LeaseRecord>>>,
    tokens: Arc<RwLock<HashMap<String, TokenRecord>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        if let Ok(mut leases) = self.leases.write() {
            leases.clear();
        }
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.clear();
        }
    }

    /// Get count of stored lease records.
    pub fn lease_count(&self) -> usize {
        self.leases.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored token records.
    pub fn token_count(&self) -> usize {
        self.tokens.read().map(|m| m.len()).unwrap_or(0)
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn lease_get(&self, conversation_id: &str) -> StoreResult<Option<LeaseRecord>> {
        let leases = self.leases.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(leases.get(conversation_id).cloned())
    }

    async fn lease_put_conditional(
        &self,
        record: &LeaseRecord,
        condition: WriteCondition,
    ) -> StoreResult<WriteOutcome> {
        let mut leases = self.leases.write().map_err(|_| StoreError::LockPoisoned)?;
        let existing = leases.get(&record.conversation_id);
        if !condition_holds(existing, &condition) {
            return Ok(WriteOutcome::ConditionFailed);
        }
        leases.insert(record.conversation_id.clone(), record.clone());
        Ok(WriteOutcome::Applied)
    }

    async fn token_get(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        let tokens = self.tokens.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tokens.get(token).cloned())
    }

    async fn token_put(&self, record: &TokenRecord) -> StoreResult<()> {
        let mut tokens = self.tokens.write().map_err(|_| StoreError::LockPoisoned)?;
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn sweep_expired(&self, now: EpochSeconds) -> StoreResult<u64> {
        let mut removed = 0u64;
        {
            let mut leases = self.leases.write().map_err(|_| StoreError::LockPoisoned)?;
            let before = leases.len();
            leases.retain(|_, record| record.record_expiry_at > now);
            removed += (before - leases.len()) as u64;
        }
        {
            let mut tokens = self.tokens.write().map_err(|_| StoreError::LockPoisoned)?;
            let before = tokens.len();
            tokens.retain(|_, record| record.record_expiry_at > now);
            removed += (before - tokens.len()) as u64;
        }
        Ok(removed)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(self.leases.read().is_ok())
    }
}

// =============================================================================
// TESTS
// =============================================================================
