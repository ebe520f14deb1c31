//! Delivery Pipeline Client
//!
//! The delivery pipeline composes and sends the actual notification (the
//! transcript email). It is an external collaborator reached over HTTP.
//! The lease manager only ever invokes it while holding a granted lease,
//! and feeds its failure mode back into the lease `Fail` transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dispatch_core::DeliveryError;
use serde::{Deserialize, Serialize};

// ============================================================================
// NOTIFICATION PAYLOAD
// ============================================================================

/// What the delivery pipeline needs to compose one lead notification.
///
/// The summary is supplied finished by the caller; this core never builds
/// message bodies. The token, when present, powers the "text customer" link
/// inside the notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadNotification {
    pub conversation_id: String,

    /// Why the send fired (e.g. "idle", "pagehide", "manual").
    pub reason: String,

    /// Finished transcript summary, composed by the caller.
    pub summary: String,

    /// Link token issued for this send, if the visitor left a callback
    /// number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_link_token: Option<String>,
}

// ============================================================================
// PIPELINE TRAIT
// ============================================================================

/// Seam for the outbound notification send.
#[async_trait]
pub trait DeliveryPipeline: Send + Sync {
    /// Send one notification. Must complete within a bounded timeout.
    async fn deliver(&self, notification: &LeadNotification) -> Result<(), DeliveryError>;
}

// ============================================================================
// HTTP IMPLEMENTATION
// ============================================================================

/// Delivery pipeline reached over HTTP (the internal mailer endpoint).
pub struct HttpDelivery {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl HttpDelivery {
    /// Create an HTTP delivery client with a bounded per-call timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Request {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl DeliveryPipeline for HttpDelivery {
    async fn deliver(&self, notification: &LeadNotification) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    DeliveryError::Request {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::EndpointStatus {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            conversation_id = %notification.conversation_id,
            reason = %notification.reason,
            "Delivered lead notification"
        );
        Ok(())
    }
}

// ============================================================================
// RECORDING IMPLEMENTATION
// ============================================================================

/// Delivery double that records notifications instead of sending them.
///
/// Used by tests, and by local development when no mailer endpoint is
/// configured.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    delivered: Mutex<Vec<LeadNotification>>,
    failing: AtomicBool,
}

impl RecordingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `deliver` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of notifications recorded so far.
    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// The most recently recorded notification.
    pub fn last(&self) -> Option<LeadNotification> {
        self.delivered.lock().ok().and_then(|d| d.last().cloned())
    }
}

#[async_trait]
impl DeliveryPipeline for RecordingDelivery {
    async fn deliver(&self, notification: &LeadNotification) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Request {
                reason: "simulated delivery failure".to_string(),
            });
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(notification.clone());
        }
        tracing::info!(
            conversation_id = %notification.conversation_id,
            "Recorded lead notification (no delivery endpoint configured)"
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_notification() -> LeadNotification {
        LeadNotification {
            conversation_id: "conv-1".to_string(),
            reason: "idle".to_string(),
            summary: "Visitor asked about pricing".to_string(),
            text_link_token: None,
        }
    }

    #[tokio::test]
    async fn test_recording_delivery_records() {
        let delivery = RecordingDelivery::new();
        delivery.deliver(&sample_notification()).await.unwrap();
        assert_eq!(delivery.delivered_count(), 1);
        assert_eq!(delivery.last().unwrap().conversation_id, "conv-1");
    }

    #[tokio::test]
    async fn test_recording_delivery_failure_injection() {
        let delivery = RecordingDelivery::new();
        delivery.set_failing(true);
        let err = delivery.deliver(&sample_notification()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Request { .. }));
        assert_eq!(delivery.delivered_count(), 0);

        delivery.set_failing(false);
        delivery.deliver(&sample_notification()).await.unwrap();
        assert_eq!(delivery.delivered_count(), 1);
    }

    #[test]
    fn test_notification_omits_absent_token() {
        let json = serde_json::to_string(&sample_notification()).unwrap();
        assert!(!json.contains("text_link_token"));

        let with_token = LeadNotification {
            text_link_token: Some("11111111-2222-4333-8444-555555555555".to_string()),
            ..sample_notification()
        };
        let json = serde_json::to_string(&with_token).unwrap();
        assert!(json.contains("text_link_token"));
    }
}
