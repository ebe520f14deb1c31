//! LMDB-backed durable store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped,
//! transactional key-value store. LMDB serializes write transactions, so
//! evaluating a write condition and applying the write inside one
//! transaction gives the per-key linearizability the contract requires.
//!
//! Records are stored as JSON under two named databases, `leases` keyed by
//! conversation id and `tokens` keyed by token string. Physical expiry is
//! handled by `sweep_expired`, driven by the API crate's retention sweeper.

use std::path::Path;

use async_trait::async_trait;
use dispatch_core::{EpochSeconds, LeaseRecord, StoreError, StoreResult, TokenRecord};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::{condition_holds, KeyedStore, WriteCondition, WriteOutcome};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization(reason) => StoreError::Serialization { reason },
            other => StoreError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}

/// LMDB-backed keyed store.
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// Lease records keyed by conversation id.
    leases: Database<Str, Bytes>,
    /// Token records keyed by token string.
    tokens: Database<Str, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(2)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let leases: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some("leases"))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        let tokens: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some("tokens"))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            leases,
            tokens,
        })
    }

    fn decode_lease(bytes: &[u8]) -> Result<LeaseRecord, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Serialization(e.to_string()))
    }

    fn decode_token(bytes: &[u8]) -> Result<TokenRecord, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl KeyedStore for LmdbStore {
    async fn lease_get(&self, conversation_id: &str) -> StoreResult<Option<LeaseRecord>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let bytes = self
            .leases
            .get(&rtxn, conversation_id)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        match bytes {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode_lease(bytes)?)),
        }
    }

    async fn lease_put_conditional(
        &self,
        record: &LeaseRecord,
        condition: WriteCondition,
    ) -> StoreResult<WriteOutcome> {
        // Evaluate and write inside one write transaction. LMDB allows a
        // single writer at a time, which makes this section atomic per key.
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let existing = match self
            .leases
            .get(&wtxn, &record.conversation_id)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
        {
            None => None,
            Some(bytes) => Some(Self::decode_lease(bytes)?),
        };

        if !condition_holds(existing.as_ref(), &condition) {
            return Ok(WriteOutcome::ConditionFailed);
        }

        let encoded = serde_json::to_vec(record)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        self.leases
            .put(&mut wtxn, &record.conversation_id, &encoded)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(WriteOutcome::Applied)
    }

    async fn token_get(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let bytes = self
            .tokens
            .get(&rtxn, token)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        match bytes {
            None => Ok(None),
            Some(bytes) => Ok(Some(Self::decode_token(bytes)?)),
        }
    }

    async fn token_put(&self, record: &TokenRecord) -> StoreResult<()> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        let encoded = serde_json::to_vec(record)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        self.tokens
            .put(&mut wtxn, &record.token, &encoded)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn sweep_expired(&self, now: EpochSeconds) -> StoreResult<u64> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut expired_leases: Vec<String> = Vec::new();
        {
            let iter = self
                .leases
                .iter(&wtxn)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            for entry in iter {
                let (key, bytes) =
                    entry.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
                match Self::decode_lease(bytes) {
                    Ok(record) if record.record_expiry_at <= now => {
                        expired_leases.push(key.to_string());
                    }
                    Ok(_) => {}
                    // An undecodable record is unrecoverable; reclaim it.
                    Err(_) => expired_leases.push(key.to_string()),
                }
            }
        }

        let mut expired_tokens: Vec<String> = Vec::new();
        {
            let iter = self
                .tokens
                .iter(&wtxn)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
            for entry in iter {
                let (key, bytes) =
                    entry.map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
                match Self::decode_token(bytes) {
                    Ok(record) if record.record_expiry_at <= now => {
                        expired_tokens.push(key.to_string());
                    }
                    Ok(_) => {}
                    Err(_) => expired_tokens.push(key.to_string()),
                }
            }
        }

        let mut removed = 0u64;
        for key in &expired_leases {
            if self
                .leases
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                removed += 1;
            }
        }
        for key in &expired_tokens {
            if self
                .tokens
                .delete(&mut wtxn, key)
                .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?
            {
                removed += 1;
            }
        }

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        if removed > 0 {
            tracing::debug!(removed, "Swept expired records from LMDB store");
        }
        Ok(removed)
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        self.leases
            .len(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;
        Ok(true)
    }
}

// =============================================================================
// TESTS
// =============================================================================
