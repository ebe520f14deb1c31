//! Lead Dedupe Lease Service
//!
//! Serializes notification attempts per conversation and guarantees
//! idempotent delivery under retries and concurrent callers (two browser
//! tabs firing "idle" and "pagehide" sends near-simultaneously is the
//! canonical case). All coordination state lives in the keyed store; the
//! conditional write is the single source of truth for exclusivity, never
//! a prior read.

use dispatch_core::{
    acquire_decision, new_link_token, AcquireDecision, AcquireOutcome, DeliveryError,
    EpochSeconds, LeaseRecord, LeaseSettings, StoreError, TokenRecord,
};
use dispatch_storage::{KeyedStore, WriteCondition, WriteOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delivery::{DeliveryPipeline, LeadNotification};

// ============================================================================
// REQUEST / OUTCOME TYPES
// ============================================================================

/// Inbound "send lead" request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRequest {
    /// Stable id grouping all messages of one chat session; the dedupe key.
    pub conversation_id: String,

    /// Why the send fired (e.g. "idle", "pagehide", "manual").
    pub reason: String,

    /// Finished transcript summary supplied by the caller.
    pub summary: String,

    /// Callback number the visitor left, if any. Powers the "text customer"
    /// link token.
    #[serde(default)]
    pub visitor_phone: Option<String>,

    /// Prefilled reply text for the "text customer" link, supplied by the
    /// caller alongside the phone number.
    #[serde(default)]
    pub reply_body: Option<String>,
}

/// Outcome of a send attempt. All three variants are success-shaped at the
/// HTTP boundary so clients never retry needlessly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadOutcome {
    /// This call won the lease and the notification went out.
    Delivered { text_link_token: Option<String> },
    /// The notification already went out for this conversation.
    AlreadyHandled,
    /// Another holder owns the attempt (unexpired lease or active cooldown,
    /// or a lost conditional-write race).
    Deferred,
}

/// Hard failures of a send attempt.
#[derive(Debug, Clone, Error)]
pub enum LeadSendError {
    /// Store infrastructure failure; retryable by the caller with backoff.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The delivery pipeline failed; the lease entered its error cooldown.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

// ============================================================================
// LEASE OPERATIONS
// ============================================================================

/// Acquire the send lease for one conversation.
///
/// The preceding read only classifies (and short-circuits the obvious
/// `Sent` case); exclusivity comes from the conditional write alone. A
/// lost race is reported as `HeldByOther`, never `Granted`.
pub async fn acquire_lease(
    store: &dyn KeyedStore,
    settings: &LeaseSettings,
    conversation_id: &str,
    now: EpochSeconds,
) -> Result<AcquireOutcome, StoreError> {
    let existing = store.lease_get(conversation_id).await?;
    match acquire_decision(existing.as_ref(), now) {
        AcquireDecision::AlreadySent => {
            tracing::debug!(conversation_id, "Lead already sent, suppressing duplicate");
            return Ok(AcquireOutcome::AlreadySent);
        }
        AcquireDecision::Blocked => {
            tracing::debug!(conversation_id, "Lead held by another attempt, deferring");
            return Ok(AcquireOutcome::HeldByOther);
        }
        AcquireDecision::Attempt => {}
    }

    let lease = LeaseRecord::acquired(conversation_id, now, settings);
    match store
        .lease_put_conditional(&lease, WriteCondition::Acquirable { now })
        .await?
    {
        WriteOutcome::Applied => {
            tracing::info!(
                conversation_id,
                lease_token = %lease.lease_token,
                "Lease granted"
            );
            Ok(AcquireOutcome::Granted { lease })
        }
        WriteOutcome::ConditionFailed => {
            // Another writer won between our read and our write.
            tracing::debug!(conversation_id, "Lost acquire race, deferring");
            Ok(AcquireOutcome::HeldByOther)
        }
    }
}

/// Transition `Leased -> Sent`. A failed condition signals a lost race that
/// already resulted in duplicate-safe behavior, so it is logged, not
/// retried.
pub async fn commit_lease(store: &dyn KeyedStore, lease: &LeaseRecord) {
    let committed = lease.committed();
    match store
        .lease_put_conditional(
            &committed,
            WriteCondition::HeldBy {
                lease_token: lease.lease_token,
            },
        )
        .await
    {
        Ok(WriteOutcome::Applied) => {
            tracing::info!(
                conversation_id = %lease.conversation_id,
                "Lead committed as sent"
            );
        }
        Ok(WriteOutcome::ConditionFailed) => {
            tracing::warn!(
                conversation_id = %lease.conversation_id,
                "Commit lost the lease; another holder took over"
            );
        }
        Err(e) => {
            tracing::error!(
                conversation_id = %lease.conversation_id,
                error = %e,
                "Store error while committing lease; record will self-heal on expiry"
            );
        }
    }
}

/// Transition `Leased -> Error`, blocking retries until the cooldown
/// elapses. Same silent-failure policy as commit.
pub async fn fail_lease(
    store: &dyn KeyedStore,
    lease: &LeaseRecord,
    now: EpochSeconds,
    settings: &LeaseSettings,
) {
    let failed = lease.failed(now, settings);
    match store
        .lease_put_conditional(
            &failed,
            WriteCondition::HeldBy {
                lease_token: lease.lease_token,
            },
        )
        .await
    {
        Ok(WriteOutcome::Applied) => {}
        Ok(WriteOutcome::ConditionFailed) => {
            tracing::warn!(
                conversation_id = %lease.conversation_id,
                "Fail transition lost the lease; another holder took over"
            );
        }
        Err(e) => {
            tracing::error!(
                conversation_id = %lease.conversation_id,
                error = %e,
                "Store error while failing lease; record will self-heal on expiry"
            );
        }
    }
}

// ============================================================================
// SEND LEAD
// ============================================================================

/// Attempt to send the lead notification for one conversation.
///
/// Acquires the lease, invokes the delivery pipeline only on a grant, then
/// commits or fails. A crash between grant and commit/fail needs no
/// handling here: the record self-heals through natural lease expiry.
pub async fn send_lead(
    store: &dyn KeyedStore,
    delivery: &dyn DeliveryPipeline,
    settings: &LeaseSettings,
    request: &LeadRequest,
    now: EpochSeconds,
) -> Result<LeadOutcome, LeadSendError> {
    let lease = match acquire_lease(store, settings, &request.conversation_id, now).await? {
        AcquireOutcome::AlreadySent => return Ok(LeadOutcome::AlreadyHandled),
        AcquireOutcome::HeldByOther => return Ok(LeadOutcome::Deferred),
        AcquireOutcome::Granted { lease } => lease,
    };

    // Pre-generate the link token so the notification can embed it; the
    // record is only stored once delivery succeeded.
    let token = match (&request.visitor_phone, &request.reply_body) {
        (Some(phone), Some(body)) => Some(TokenRecord {
            token: new_link_token(),
            destination: phone.clone(),
            body: body.clone(),
            record_expiry_at: now + settings.token_ttl_secs,
        }),
        _ => None,
    };

    let notification = LeadNotification {
        conversation_id: request.conversation_id.clone(),
        reason: request.reason.clone(),
        summary: request.summary.clone(),
        text_link_token: token.as_ref().map(|t| t.token.clone()),
    };

    if let Err(delivery_err) = delivery.deliver(&notification).await {
        tracing::warn!(
            conversation_id = %request.conversation_id,
            error = %delivery_err,
            "Delivery failed, entering error cooldown"
        );
        fail_lease(store, &lease, now, settings).await;
        return Err(LeadSendError::Delivery(delivery_err));
    }

    // The notification is out. From here on, nothing may fail the request:
    // duplicate suppression already did its job.
    if let Some(token_record) = &token {
        if let Err(e) = store.token_put(token_record).await {
            tracing::error!(
                conversation_id = %request.conversation_id,
                error = %e,
                "Failed to store link token after delivery; link will be dead"
            );
        }
    }

    commit_lease(store, &lease).await;

    Ok(LeadOutcome::Delivered {
        text_link_token: token.map(|t| t.token),
    })
}

// =============================================================================
// TESTS
// =============================================================================
