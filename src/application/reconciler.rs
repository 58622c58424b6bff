use crate::application::ReconcileOutcome;
use crate::application::ledger::InternshipLedger;
use crate::application::mentorship::MentorshipDesk;
use crate::domain::ports::{BookingStoreRef, ChargeStatus, MentorBookingStoreRef, PaymentGatewayRef};
use crate::domain::reference::{BookingKind, PaymentReference};
use crate::error::{BookingError, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

type HmacSha512 = Hmac<Sha512>;

/// The event name the provider sends for a successful charge.
pub const CHARGE_SUCCESS: &str = "charge.success";

/// A provider webhook payload. Only the fields the reconciler needs are
/// modeled; everything else in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    /// Provider-side transaction id, unused for routing but logged.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub metadata: WebhookMetadata,
}

#[derive(Debug, Deserialize, Default)]
pub struct WebhookMetadata {
    /// Booking id echoed back from charge initialization, used as a fallback
    /// lookup when the reference alone does not resolve.
    pub booking_id: Option<Uuid>,
}

/// Computes the hex HMAC-SHA512 signature the provider attaches to a payload.
/// Exposed so tests and the script runner can forge valid provider traffic.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Single entry point for payment confirmations.
///
/// Verifies message authenticity, classifies the payment reference, resolves
/// the booking (by reference, falling back to the embedded booking id), and
/// delegates to the owning flow's settle transition. Both the asynchronous
/// webhook and the synchronous redirect callback land here and converge on the
/// same idempotent path.
pub struct WebhookReconciler {
    ledger: Arc<InternshipLedger>,
    desk: Arc<MentorshipDesk>,
    bookings: BookingStoreRef,
    sessions: MentorBookingStoreRef,
    gateway: PaymentGatewayRef,
    secret: String,
}

impl WebhookReconciler {
    pub fn new(
        ledger: Arc<InternshipLedger>,
        desk: Arc<MentorshipDesk>,
        bookings: BookingStoreRef,
        sessions: MentorBookingStoreRef,
        gateway: PaymentGatewayRef,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            desk,
            bookings,
            sessions,
            gateway,
            secret: secret.into(),
        }
    }

    /// Handles a raw webhook delivery: authenticates, parses, applies.
    ///
    /// The signature is checked before the body is even parsed; a forged or
    /// tampered payload never reaches a booking lookup.
    pub async fn process_webhook(
        &self,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<ReconcileOutcome> {
        self.verify_signature(body, signature_hex)?;

        let event: WebhookEvent = serde_json::from_slice(body)?;
        if event.event != CHARGE_SUCCESS {
            info!(event = %event.event, "unhandled provider event acknowledged");
            return Ok(ReconcileOutcome::Ignored("unhandled event type"));
        }

        info!(
            reference = %event.data.reference,
            provider_id = ?event.data.id,
            "charge.success webhook received"
        );
        self.apply(&event.data.reference, event.data.metadata.booking_id)
            .await
    }

    /// Handles the payer returning from the provider's checkout page. The
    /// redirect carries no signed body, so the charge outcome is re-verified
    /// against the provider before the settle path runs.
    pub async fn confirm_redirect(&self, reference: &str) -> Result<ReconcileOutcome> {
        let parsed: PaymentReference = reference.parse()?;
        match self.gateway.verify(&parsed).await? {
            ChargeStatus::Success => self.apply(reference, None).await,
            status => {
                info!(reference = %reference, ?status, "redirect callback without successful charge");
                Ok(ReconcileOutcome::Ignored("charge not successful"))
            }
        }
    }

    fn verify_signature(&self, body: &[u8], signature_hex: &str) -> Result<()> {
        let signature = hex::decode(signature_hex.trim())
            .map_err(|_| BookingError::SignatureRejected)?;
        let mut mac = HmacSha512::new_from_slice(self.secret.as_bytes())
            .map_err(|_| BookingError::SignatureRejected)?;
        mac.update(body);
        // verify_slice is a constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| BookingError::SignatureRejected)
    }

    async fn apply(
        &self,
        reference: &str,
        fallback_id: Option<Uuid>,
    ) -> Result<ReconcileOutcome> {
        let parsed: PaymentReference = reference.parse()?;
        let booking_id = self.resolve(&parsed, fallback_id).await?;
        match parsed.kind() {
            BookingKind::Internship => self.ledger.settle(booking_id).await,
            BookingKind::Mentorship => self.desk.settle(booking_id).await,
        }
    }

    /// Resolves the reference to a stored booking id. Lookup order: by the
    /// full reference, then by the id embedded in the reference, then by the
    /// metadata fallback.
    async fn resolve(
        &self,
        reference: &PaymentReference,
        fallback_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let found = match reference.kind() {
            BookingKind::Internship => {
                if self.bookings.find_by_reference(reference).await?.is_some() {
                    Some(reference.booking_id())
                } else {
                    let mut candidate = self.bookings.get(reference.booking_id()).await?;
                    if candidate.is_none()
                        && let Some(id) = fallback_id
                    {
                        candidate = self.bookings.get(id).await?;
                    }
                    candidate.map(|b| b.id)
                }
            }
            BookingKind::Mentorship => {
                if self.sessions.find_by_reference(reference).await?.is_some() {
                    Some(reference.booking_id())
                } else {
                    let mut candidate = self.sessions.get(reference.booking_id()).await?;
                    if candidate.is_none()
                        && let Some(id) = fallback_id
                    {
                        candidate = self.sessions.get(id).await?;
                    }
                    candidate.map(|b| b.id)
                }
            }
        };
        match found {
            Some(id) => Ok(id),
            None => {
                warn!(reference = %reference, "payment event matches no booking");
                Err(BookingError::UnknownReference(reference.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_is_deterministic() {
        let a = sign_payload("secret", b"{\"event\":\"charge.success\"}");
        let b = sign_payload("secret", b"{\"event\":\"charge.success\"}");
        assert_eq!(a, b);
        assert_ne!(a, sign_payload("other", b"{\"event\":\"charge.success\"}"));
    }

    #[test]
    fn test_webhook_event_parsing() {
        let body = serde_json::json!({
            "event": "charge.success",
            "data": {
                "reference": "INT-abc-def",
                "id": 991,
                "metadata": { "booking_id": Uuid::nil() }
            }
        });
        let event: WebhookEvent = serde_json::from_value(body).unwrap();
        assert_eq!(event.event, CHARGE_SUCCESS);
        assert_eq!(event.data.id, Some(991));
        assert_eq!(event.data.metadata.booking_id, Some(Uuid::nil()));
    }

    #[test]
    fn test_webhook_event_parsing_without_metadata() {
        let body = r#"{"event":"charge.failed","data":{"reference":"MNT-x-y"}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.data.id, None);
        assert_eq!(event.data.metadata.booking_id, None);
    }
}
