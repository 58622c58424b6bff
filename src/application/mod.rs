//! Application layer orchestrating the domain over its ports.
//!
//! The two engines ([`ledger::InternshipLedger`] and
//! [`mentorship::MentorshipDesk`]) own the booking lifecycles; the
//! [`reconciler::WebhookReconciler`] maps provider events onto them and the
//! [`sweeper::ExpirySweeper`] releases elapsed payment windows.

pub mod ledger;
pub mod mentorship;
pub mod reconciler;
pub mod sweeper;

/// Result of applying a payment confirmation to a booking.
///
/// Every variant is a "success" towards the payment provider: duplicates and
/// late deliveries are acknowledged so the provider stops retrying, they just
/// produce no further state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The booking transitioned to paid and side effects ran.
    Applied,
    /// The booking was already paid; nothing re-applied.
    AlreadySettled,
    /// The event could not be applied (expired booking, unhandled event
    /// type, lost race); acknowledged and logged.
    Ignored(&'static str),
}

impl ReconcileOutcome {
    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
