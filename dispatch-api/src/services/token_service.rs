//! Token Resolver Service
//!
//! Turns an opaque token into its private contact payload with strict
//! validation and expiry. Lexical validation happens before any store
//! lookup, and the logical expiry check never relies on the store having
//! physically reclaimed the record.

use dispatch_core::{
    check_resolvable, validate_token_param, EpochSeconds, ResolveError, StoreError, TokenRecord,
};
use dispatch_storage::KeyedStore;
use thiserror::Error;

/// Failures of a resolve attempt.
#[derive(Debug, Clone, Error)]
pub enum ResolveFailure {
    /// Classified token lifecycle failure (missing, malformed, unknown,
    /// expired).
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Store infrastructure failure; retryable by the caller.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolve the raw `token` query parameter at `now`.
pub async fn resolve_token(
    store: &dyn KeyedStore,
    raw: Option<&str>,
    now: EpochSeconds,
) -> Result<TokenRecord, ResolveFailure> {
    let token = validate_token_param(raw)?;
    let record = store.token_get(token).await?;
    let record = check_resolvable(record, now)?;
    tracing::debug!(token, "Resolved link token");
    Ok(record)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_storage::MemoryStore;

    const TOKEN: &str = "11111111-2222-4333-8444-555555555555";

    async fn store_with_token(record_expiry_at: EpochSeconds) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .token_put(&TokenRecord {
                token: TOKEN.to_string(),
                destination: "+14081234567".to_string(),
                body: "Hello from test".to_string(),
                record_expiry_at,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_resolve_classifies_bad_params_before_lookup() {
        // Against a store that would error on any access: validation
        // failures must never reach it.
        struct PanickyStore;

        #[async_trait::async_trait]
        impl KeyedStore for PanickyStore {
            async fn lease_get(
                &self,
                _conversation_id: &str,
            ) -> dispatch_core::StoreResult<Option<dispatch_core::LeaseRecord>> {
                unreachable!("no store access expected")
            }

            async fn lease_put_conditional(
                &self,
                _record: &dispatch_core::LeaseRecord,
                _condition: dispatch_storage::WriteCondition,
            ) -> dispatch_core::StoreResult<dispatch_storage::WriteOutcome> {
                unreachable!("no store access expected")
            }

            async fn token_get(
                &self,
                _token: &str,
            ) -> dispatch_core::StoreResult<Option<TokenRecord>> {
                unreachable!("no store access expected")
            }

            async fn token_put(&self, _record: &TokenRecord) -> dispatch_core::StoreResult<()> {
                unreachable!("no store access expected")
            }

            async fn sweep_expired(
                &self,
                _now: EpochSeconds,
            ) -> dispatch_core::StoreResult<u64> {
                unreachable!("no store access expected")
            }

            async fn health_check(&self) -> dispatch_core::StoreResult<bool> {
                Ok(true)
            }
        }

        let err = resolve_token(&PanickyStore, None, 100).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveFailure::Resolve(ResolveError::MissingToken)
        ));

        let err = resolve_token(&PanickyStore, Some("abc"), 100)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveFailure::Resolve(ResolveError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_token_is_not_found() {
        let store = MemoryStore::new();
        let err = resolve_token(&store, Some(TOKEN), 100).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveFailure::Resolve(ResolveError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_resolve_live_token_returns_payload() {
        // A record expiring at 5000 observed at 100 resolves verbatim.
        let store = store_with_token(5_000).await;
        let record = resolve_token(&store, Some(TOKEN), 100).await.unwrap();
        assert_eq!(record.destination, "+14081234567");
        assert_eq!(record.body, "Hello from test");
    }

    #[tokio::test]
    async fn test_resolve_lapsed_token_is_expired() {
        // A record expiring at 100 observed at 200 is gone.
        let store = store_with_token(100).await;
        let err = resolve_token(&store, Some(TOKEN), 200).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveFailure::Resolve(ResolveError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_resolution_does_not_consume_the_token() {
        let store = store_with_token(5_000).await;
        resolve_token(&store, Some(TOKEN), 100).await.unwrap();
        // Still resolvable: tokens are multi-use within their window.
        let record = resolve_token(&store, Some(TOKEN), 200).await.unwrap();
        assert_eq!(record.destination, "+14081234567");
    }
}
