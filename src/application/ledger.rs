use crate::application::ReconcileOutcome;
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::ports::{
    BookingStoreRef, ChargeRequest, ClockRef, CompanyStoreRef, ExpiryEntry, ExpiryQueueRef,
    MailerRef, Notice, NoticeTemplate, PaymentGatewayRef,
};
use crate::domain::reference::BookingKind;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

/// The internship booking lifecycle: submit, approve, reject, settle, expire.
///
/// Every transition is persisted with a status-conditional write, so an
/// overlapping trigger (duplicate webhook, concurrent sweep) loses cleanly
/// instead of double-applying. The company slot is consumed exactly once, at
/// approval; the only restore is the compensating release when the payment
/// gateway refuses to initialize the charge.
pub struct InternshipLedger {
    bookings: BookingStoreRef,
    companies: CompanyStoreRef,
    expiries: ExpiryQueueRef,
    gateway: PaymentGatewayRef,
    mailer: MailerRef,
    clock: ClockRef,
    callback_url: String,
}

impl InternshipLedger {
    pub fn new(
        bookings: BookingStoreRef,
        companies: CompanyStoreRef,
        expiries: ExpiryQueueRef,
        gateway: PaymentGatewayRef,
        mailer: MailerRef,
        clock: ClockRef,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            companies,
            expiries,
            gateway,
            mailer,
            clock,
            callback_url: callback_url.into(),
        }
    }

    /// Records an application in `pending`. No slot is reserved yet, but a
    /// company with no remaining capacity refuses submissions outright.
    pub async fn submit(
        &self,
        company_id: &str,
        student_id: &str,
        cv_path: &str,
        amount: Decimal,
    ) -> Result<Booking> {
        let company = self
            .companies
            .get(company_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("company {company_id}")))?;
        if !company.has_capacity() {
            return Err(BookingError::SlotsExhausted(company.id));
        }

        let booking = Booking::submit(company_id, student_id, cv_path, amount, self.clock.now())?;
        self.bookings.insert(booking.clone()).await?;
        info!(booking = %booking.id, company = company_id, "internship application submitted");
        Ok(booking)
    }

    /// Approves a pending application: reserves the slot, stamps the payment
    /// reference and 24h window, registers the charge with the provider, and
    /// schedules the deferred expiry.
    ///
    /// The slot reservation is the atomic check-and-decrement in the company
    /// store; if anything downstream fails the reservation is released and the
    /// booking is back in `pending`.
    pub async fn approve(&self, booking_id: Uuid) -> Result<Booking> {
        let mut booking = self.get(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidState {
                expected: "pending",
                found: booking.status.to_string(),
            });
        }

        self.companies.reserve_slot(&booking.company_id).await?;

        let now = self.clock.now();
        let reference = match booking.approve(now) {
            Ok(reference) => reference,
            Err(e) => {
                self.companies.release_slot(&booking.company_id).await?;
                return Err(e);
            }
        };
        if !self
            .bookings
            .store_if_status(booking.clone(), BookingStatus::Pending)
            .await?
        {
            // Lost to a concurrent approve/reject of the same booking.
            self.companies.release_slot(&booking.company_id).await?;
            let found = self.get(booking_id).await?.status.to_string();
            return Err(BookingError::InvalidState {
                expected: "pending",
                found,
            });
        }

        let request = ChargeRequest {
            reference: reference.clone(),
            amount: booking.amount,
            payer: booking.student_id.clone(),
            callback_url: self.callback_url.clone(),
        };
        if let Err(e) = self.gateway.initialize(request).await {
            warn!(booking = %booking.id, error = %e, "payment initialization failed, rolling back reservation");
            let mut reverted = booking.clone();
            reverted.revert_approval();
            self.bookings
                .store_if_status(reverted, BookingStatus::Approved)
                .await?;
            self.companies.release_slot(&booking.company_id).await?;
            return Err(BookingError::Gateway(e.to_string()));
        }

        self.expiries
            .schedule(ExpiryEntry {
                kind: BookingKind::Internship,
                booking_id: booking.id,
                due_at: booking.expires_at.unwrap_or(now),
            })
            .await?;
        self.notify(&booking, NoticeTemplate::InternshipApproved)
            .await;
        info!(booking = %booking.id, reference = %reference, "internship booking approved");
        Ok(booking)
    }

    /// Rejects a pending application with an operator-supplied reason.
    pub async fn reject(&self, booking_id: Uuid, reason: &str) -> Result<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.reject(reason)?;

        if !self
            .bookings
            .store_if_status(booking.clone(), BookingStatus::Pending)
            .await?
        {
            let found = self.get(booking_id).await?.status.to_string();
            return Err(BookingError::InvalidState {
                expected: "pending",
                found,
            });
        }
        self.notify(&booking, NoticeTemplate::InternshipRejected)
            .await;
        info!(booking = %booking.id, "internship booking rejected");
        Ok(booking)
    }

    /// Applies a confirmed payment. Idempotent: already-settled bookings are
    /// acknowledged without side effects, and the slot counter is not touched
    /// here at all (it was consumed at approval).
    pub async fn settle(&self, booking_id: Uuid) -> Result<ReconcileOutcome> {
        let mut booking = self.get(booking_id).await?;
        match booking.status {
            BookingStatus::Paid => {
                warn!(booking = %booking.id, "duplicate payment confirmation ignored");
                return Ok(ReconcileOutcome::AlreadySettled);
            }
            BookingStatus::Expired => {
                warn!(booking = %booking.id, "late payment confirmation for expired booking ignored");
                return Ok(ReconcileOutcome::Ignored("booking already expired"));
            }
            BookingStatus::Approved => {}
            _ => {
                warn!(booking = %booking.id, status = %booking.status, "payment confirmation for booking not awaiting payment");
                return Ok(ReconcileOutcome::Ignored("booking not awaiting payment"));
            }
        }

        booking.settle()?;
        if !self
            .bookings
            .store_if_status(booking.clone(), BookingStatus::Approved)
            .await?
        {
            // A concurrent settle or expire committed first.
            return match self.get(booking_id).await?.status {
                BookingStatus::Paid => Ok(ReconcileOutcome::AlreadySettled),
                _ => Ok(ReconcileOutcome::Ignored("lost race to concurrent transition")),
            };
        }

        self.notify(&booking, NoticeTemplate::InternshipPaid).await;
        info!(booking = %booking.id, "internship booking paid");
        Ok(ReconcileOutcome::Applied)
    }

    /// Expires an approved booking whose payment window has elapsed. Returns
    /// whether the transition was applied; any precondition miss (already
    /// paid, window still open, lost race) is a quiet no-op so the sweep can
    /// run concurrently with reconciliation.
    pub async fn expire(&self, booking_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let Some(mut booking) = self.bookings.get(booking_id).await? else {
            return Ok(false);
        };
        if booking.expire(now).is_err() {
            return Ok(false);
        }
        let applied = self
            .bookings
            .store_if_status(booking, BookingStatus::Approved)
            .await?;
        if applied {
            info!(booking = %booking_id, "internship booking expired unpaid");
        }
        Ok(applied)
    }

    async fn get(&self, booking_id: Uuid) -> Result<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))
    }

    async fn notify(&self, booking: &Booking, template: NoticeTemplate) {
        let notice = Notice {
            template,
            recipient: booking.student_id.clone(),
            booking_id: booking.id,
        };
        if let Err(e) = self.mailer.send(notice).await {
            warn!(booking = %booking.id, error = %e, "notification dispatch failed");
        }
    }
}
