use crate::domain::booking::PAYMENT_WINDOW_HOURS;
use crate::domain::reference::{BookingKind, PaymentReference};
use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum MentorBookingStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
    Expired,
}

impl fmt::Display for MentorBookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        })
    }
}

/// A one-on-one mentorship session reservation.
///
/// Lifecycle: `pending -> paid` with `pending -> expired` as the failure exit;
/// `completed` and `cancelled` are post-payment bookkeeping states. Unlike an
/// internship booking, nothing is reserved at creation time, so expiry needs no
/// compensating action.
///
/// Invariant: `payment_expires_at` is set iff the booking is `pending`. At most
/// one booking per mentor+timestamp holds `paid`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct MentorBooking {
    pub id: Uuid,
    pub mentor_id: String,
    pub student_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub amount: Decimal,
    pub status: MentorBookingStatus,
    pub payment_reference: PaymentReference,
    pub payment_expires_at: Option<DateTime<Utc>>,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MentorBooking {
    pub fn initiate(
        mentor_id: impl Into<String>,
        student_id: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if scheduled_at <= now {
            return Err(BookingError::Validation(
                "session must be scheduled in the future".to_string(),
            ));
        }
        let id = Uuid::new_v4();
        Ok(Self {
            id,
            mentor_id: mentor_id.into(),
            student_id: student_id.into(),
            scheduled_at,
            amount,
            status: MentorBookingStatus::Pending,
            payment_reference: PaymentReference::generate(BookingKind::Mentorship, id),
            payment_expires_at: Some(now + Duration::hours(PAYMENT_WINDOW_HOURS)),
            meeting_link: None,
            created_at: now,
        })
    }

    /// Whether this record blocks another request for the same mentor+time.
    ///
    /// A `paid` booking always conflicts. A `pending` booking conflicts only
    /// while its payment window is open; the window is re-derived from the
    /// clock so a stale `pending` row blocks nobody even before a sweep has
    /// caught up with it.
    pub fn blocks_slot(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            MentorBookingStatus::Paid => true,
            MentorBookingStatus::Pending => self
                .payment_expires_at
                .is_some_and(|deadline| deadline > now),
            _ => false,
        }
    }

    /// Moves `pending -> paid`, recording the provisioned meeting link if one
    /// came back in time. Terminal for the payment lifecycle.
    pub fn settle(&mut self, meeting_link: Option<String>) -> Result<()> {
        if self.status != MentorBookingStatus::Pending {
            return Err(BookingError::InvalidState {
                expected: "pending",
                found: self.status.to_string(),
            });
        }
        self.status = MentorBookingStatus::Paid;
        self.payment_expires_at = None;
        self.meeting_link = meeting_link;
        Ok(())
    }

    /// Moves `pending -> expired` once the payment window has elapsed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        match (self.status, self.payment_expires_at) {
            (MentorBookingStatus::Pending, Some(deadline)) if deadline <= now => {
                self.status = MentorBookingStatus::Expired;
                self.payment_expires_at = None;
                Ok(())
            }
            _ => Err(BookingError::InvalidState {
                expected: "pending with elapsed payment window",
                found: self.status.to_string(),
            }),
        }
    }
}
