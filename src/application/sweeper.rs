use crate::application::ledger::InternshipLedger;
use crate::application::mentorship::MentorshipDesk;
use crate::domain::booking::BookingStatus;
use crate::domain::mentorship::MentorBookingStatus;
use crate::domain::ports::{BookingStoreRef, ClockRef, ExpiryQueueRef, MentorBookingStoreRef};
use crate::domain::reference::BookingKind;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Counts of bookings released by one sweep run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub internships_expired: usize,
    pub sessions_expired: usize,
}

/// Releases bookings whose payment window elapsed without a payment.
///
/// Two sources feed it: the deferred per-booking entries queued at approval
/// time, and a full scan of both stores so a lost queue entry cannot strand a
/// booking. Every expiry is applied through the engines' conditional
/// transitions, so a sweep racing a reconciliation for the same booking is
/// settled by whichever write commits first; the loser is a counted-out no-op.
pub struct ExpirySweeper {
    ledger: Arc<InternshipLedger>,
    desk: Arc<MentorshipDesk>,
    bookings: BookingStoreRef,
    sessions: MentorBookingStoreRef,
    expiries: ExpiryQueueRef,
    clock: ClockRef,
}

impl ExpirySweeper {
    pub fn new(
        ledger: Arc<InternshipLedger>,
        desk: Arc<MentorshipDesk>,
        bookings: BookingStoreRef,
        sessions: MentorBookingStoreRef,
        expiries: ExpiryQueueRef,
        clock: ClockRef,
    ) -> Self {
        Self {
            ledger,
            desk,
            bookings,
            sessions,
            expiries,
            clock,
        }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for entry in self.expiries.drain_due(now).await? {
            let applied = match entry.kind {
                BookingKind::Internship => self.ledger.expire(entry.booking_id, now).await?,
                BookingKind::Mentorship => self.desk.expire(entry.booking_id, now).await?,
            };
            if applied {
                match entry.kind {
                    BookingKind::Internship => report.internships_expired += 1,
                    BookingKind::Mentorship => report.sessions_expired += 1,
                }
            }
        }

        // Safety-net scan: catches bookings whose queue entry was lost or
        // whose deadline passed between sweeps.
        for booking in self
            .bookings
            .list_with_status(BookingStatus::Approved)
            .await?
        {
            if booking.expires_at.is_some_and(|deadline| deadline <= now)
                && self.ledger.expire(booking.id, now).await?
            {
                report.internships_expired += 1;
            }
        }
        for session in self
            .sessions
            .list_with_status(MentorBookingStatus::Pending)
            .await?
        {
            if session
                .payment_expires_at
                .is_some_and(|deadline| deadline <= now)
                && self.desk.expire(session.id, now).await?
            {
                report.sessions_expired += 1;
            }
        }

        info!(
            internships = report.internships_expired,
            sessions = report.sessions_expired,
            "expiry sweep complete"
        );
        Ok(report)
    }
}
