use crate::domain::reference::{BookingKind, PaymentReference};
use crate::error::{BookingError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How long an approved booking waits for payment before it expires.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
    Expired,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
            Self::Expired => "expired",
        })
    }
}

/// An internship slot reservation attempt.
///
/// Lifecycle: `pending -> approved -> paid`, with `pending -> rejected` and
/// `approved -> expired` as the failure exits. The transition methods guard on
/// the current status and never partially apply; callers persist the result
/// with a status-conditional store so concurrent transitions cannot both win.
///
/// Invariant: `expires_at` is set iff the booking is `approved`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub company_id: String,
    pub student_id: String,
    /// Opaque storage path of the uploaded CV; content is never inspected.
    pub cv_path: String,
    pub amount: Decimal,
    pub status: BookingStatus,
    pub payment_reference: Option<PaymentReference>,
    pub expires_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn submit(
        company_id: impl Into<String>,
        student_id: impl Into<String>,
        cv_path: impl Into<String>,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if amount <= Decimal::ZERO {
            return Err(BookingError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            company_id: company_id.into(),
            student_id: student_id.into(),
            cv_path: cv_path.into(),
            amount,
            status: BookingStatus::Pending,
            payment_reference: None,
            expires_at: None,
            rejection_reason: None,
            created_at: now,
        })
    }

    fn require(&self, expected: BookingStatus, label: &'static str) -> Result<()> {
        if self.status != expected {
            return Err(BookingError::InvalidState {
                expected: label,
                found: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Moves `pending -> approved`, stamping a fresh payment reference and the
    /// payment deadline. The slot reservation itself happens in the store, not
    /// here.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<PaymentReference> {
        self.require(BookingStatus::Pending, "pending")?;
        let reference = PaymentReference::generate(BookingKind::Internship, self.id);
        self.status = BookingStatus::Approved;
        self.payment_reference = Some(reference.clone());
        self.expires_at = Some(now + Duration::hours(PAYMENT_WINDOW_HOURS));
        Ok(reference)
    }

    /// Undoes a just-applied approval after a gateway initialization failure.
    pub fn revert_approval(&mut self) {
        self.status = BookingStatus::Pending;
        self.payment_reference = None;
        self.expires_at = None;
    }

    /// Moves `pending -> rejected` with an operator-supplied reason. Terminal.
    pub fn reject(&mut self, reason: &str) -> Result<()> {
        self.require(BookingStatus::Pending, "pending")?;
        let len = reason.chars().count();
        if !(10..=1000).contains(&len) {
            return Err(BookingError::Validation(
                "rejection reason must be 10-1000 characters".to_string(),
            ));
        }
        self.status = BookingStatus::Rejected;
        self.rejection_reason = Some(reason.to_string());
        self.expires_at = None;
        Ok(())
    }

    /// Moves `approved -> paid` once the payment is confirmed. Terminal.
    pub fn settle(&mut self) -> Result<()> {
        self.require(BookingStatus::Approved, "approved")?;
        self.status = BookingStatus::Paid;
        self.expires_at = None;
        Ok(())
    }

    /// Moves `approved -> expired` once the payment window has elapsed.
    /// Terminal. Slot accounting is untouched.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.require(BookingStatus::Approved, "approved")?;
        match self.expires_at {
            Some(deadline) if deadline <= now => {
                self.status = BookingStatus::Expired;
                self.expires_at = None;
                Ok(())
            }
            _ => Err(BookingError::InvalidState {
                expected: "approved with elapsed payment window",
                found: self.status.to_string(),
            }),
        }
    }
}
