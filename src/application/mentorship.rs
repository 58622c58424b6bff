use crate::application::ReconcileOutcome;
use crate::domain::mentorship::{MentorBooking, MentorBookingStatus};
use crate::domain::ports::{
    ChargeRequest, ClockRef, ExpiryEntry, ExpiryQueueRef, MailerRef, MeetingProvisionerRef,
    MentorBookingStoreRef, Notice, NoticeTemplate, PaymentGatewayRef,
};
use crate::domain::reference::BookingKind;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

/// The mentorship session lifecycle: initiate, settle, expire.
///
/// Nothing is reserved at initiation beyond the booking row itself, so the
/// failure paths are simpler than the internship flow: a gateway failure
/// deletes the row, and expiry needs no compensating action. The settle path
/// is shared by the asynchronous webhook and the synchronous browser redirect
/// and must converge without provisioning the meeting twice.
pub struct MentorshipDesk {
    sessions: MentorBookingStoreRef,
    expiries: ExpiryQueueRef,
    gateway: PaymentGatewayRef,
    meetings: MeetingProvisionerRef,
    mailer: MailerRef,
    clock: ClockRef,
    callback_url: String,
}

impl MentorshipDesk {
    pub fn new(
        sessions: MentorBookingStoreRef,
        expiries: ExpiryQueueRef,
        gateway: PaymentGatewayRef,
        meetings: MeetingProvisionerRef,
        mailer: MailerRef,
        clock: ClockRef,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            expiries,
            gateway,
            meetings,
            mailer,
            clock,
            callback_url: callback_url.into(),
        }
    }

    /// Books a session slot and obtains the payment authorization URL.
    ///
    /// The conflict check (paid booking, or pending booking with an open
    /// payment window) runs atomically with the insert inside the store. If
    /// the gateway refuses the charge the row is deleted again; no reservation
    /// ever existed outside it.
    pub async fn initiate(
        &self,
        mentor_id: &str,
        student_id: &str,
        scheduled_at: DateTime<Utc>,
        amount: Decimal,
    ) -> Result<(MentorBooking, String)> {
        let now = self.clock.now();
        let booking = MentorBooking::initiate(mentor_id, student_id, scheduled_at, amount, now)?;

        if !self.sessions.insert_if_free(booking.clone(), now).await? {
            return Err(BookingError::Conflict);
        }

        let request = ChargeRequest {
            reference: booking.payment_reference.clone(),
            amount: booking.amount,
            payer: booking.student_id.clone(),
            callback_url: self.callback_url.clone(),
        };
        match self.gateway.initialize(request).await {
            Ok(authorization_url) => {
                self.expiries
                    .schedule(ExpiryEntry {
                        kind: BookingKind::Mentorship,
                        booking_id: booking.id,
                        due_at: booking.payment_expires_at.unwrap_or(now),
                    })
                    .await?;
                info!(booking = %booking.id, mentor = mentor_id, "mentorship session initiated");
                Ok((booking, authorization_url))
            }
            Err(e) => {
                warn!(booking = %booking.id, error = %e, "payment initialization failed, discarding session");
                self.sessions.remove(booking.id).await?;
                Err(BookingError::Gateway(e.to_string()))
            }
        }
    }

    /// Applies a confirmed payment: provisions the meeting, persists the link,
    /// moves to `paid`, and notifies both parties.
    ///
    /// Reachable from both the webhook and the redirect callback; the status
    /// check up front plus the conditional write keep the meeting from being
    /// provisioned twice. A provisioning failure leaves the link pending and
    /// is not an error.
    pub async fn settle(&self, booking_id: Uuid) -> Result<ReconcileOutcome> {
        let mut booking = self.get(booking_id).await?;
        match booking.status {
            MentorBookingStatus::Paid => {
                warn!(booking = %booking.id, "duplicate payment confirmation ignored");
                return Ok(ReconcileOutcome::AlreadySettled);
            }
            MentorBookingStatus::Pending => {}
            _ => {
                warn!(booking = %booking.id, status = %booking.status, "payment confirmation for session not awaiting payment");
                return Ok(ReconcileOutcome::Ignored("session not awaiting payment"));
            }
        }

        let meeting_link = match self
            .meetings
            .create_meeting(&booking.mentor_id, booking.scheduled_at)
            .await
        {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(booking = %booking.id, error = %e, "meeting provisioning failed, link pending");
                None
            }
        };

        booking.settle(meeting_link)?;
        if !self
            .sessions
            .store_if_status(booking.clone(), MentorBookingStatus::Pending)
            .await?
        {
            return match self.get(booking_id).await?.status {
                MentorBookingStatus::Paid => Ok(ReconcileOutcome::AlreadySettled),
                _ => Ok(ReconcileOutcome::Ignored("lost race to concurrent transition")),
            };
        }

        self.notify(&booking, NoticeTemplate::SessionConfirmedStudent, &booking.student_id)
            .await;
        self.notify(&booking, NoticeTemplate::SessionConfirmedMentor, &booking.mentor_id)
            .await;
        info!(booking = %booking.id, "mentorship session paid");
        Ok(ReconcileOutcome::Applied)
    }

    /// Expires a pending session whose payment window has elapsed. No resource
    /// counter to compensate; precondition misses are quiet no-ops.
    pub async fn expire(&self, booking_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let Some(mut booking) = self.sessions.get(booking_id).await? else {
            return Ok(false);
        };
        if booking.expire(now).is_err() {
            return Ok(false);
        }
        let applied = self
            .sessions
            .store_if_status(booking, MentorBookingStatus::Pending)
            .await?;
        if applied {
            info!(booking = %booking_id, "mentorship session expired unpaid");
        }
        Ok(applied)
    }

    async fn get(&self, booking_id: Uuid) -> Result<MentorBooking> {
        self.sessions
            .get(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("session {booking_id}")))
    }

    async fn notify(&self, booking: &MentorBooking, template: NoticeTemplate, recipient: &str) {
        let notice = Notice {
            template,
            recipient: recipient.to_string(),
            booking_id: booking.id,
        };
        if let Err(e) = self.mailer.send(notice).await {
            warn!(booking = %booking.id, error = %e, "notification dispatch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Clock, MentorBookingStore};
    use crate::infrastructure::collaborators::{
        ManualClock, RecordingMailer, RecordingMeetingRoom, StaticGateway,
    };
    use crate::infrastructure::in_memory::{InMemoryExpiryQueue, InMemoryMentorBookingStore};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Harness {
        desk: MentorshipDesk,
        sessions: Arc<InMemoryMentorBookingStore>,
        gateway: Arc<StaticGateway>,
        meetings: Arc<RecordingMeetingRoom>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let sessions = Arc::new(InMemoryMentorBookingStore::new());
        let gateway = Arc::new(StaticGateway::new());
        let meetings = Arc::new(RecordingMeetingRoom::new());
        let mailer = Arc::new(RecordingMailer::new());
        let clock = Arc::new(ManualClock::default());
        let desk = MentorshipDesk::new(
            sessions.clone(),
            Arc::new(InMemoryExpiryQueue::new()),
            gateway.clone(),
            meetings.clone(),
            mailer.clone(),
            clock.clone(),
            "https://example.test/payments/callback",
        );
        Harness {
            desk,
            sessions,
            gateway,
            meetings,
            mailer,
            clock,
        }
    }

    fn slot(h: &Harness) -> DateTime<Utc> {
        h.clock.now() + Duration::days(2)
    }

    #[tokio::test]
    async fn test_initiate_returns_authorization_url() {
        let h = harness();
        let (booking, url) = h
            .desk
            .initiate("mentor-1", "student-1", slot(&h), dec!(30))
            .await
            .unwrap();

        assert_eq!(booking.status, MentorBookingStatus::Pending);
        assert!(url.contains(&booking.payment_reference.to_string()));
    }

    #[tokio::test]
    async fn test_initiate_rejects_taken_slot() {
        let h = harness();
        let at = slot(&h);
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", at, dec!(30))
            .await
            .unwrap();
        h.desk.settle(booking.id).await.unwrap();

        let result = h.desk.initiate("mentor-1", "student-2", at, dec!(30)).await;
        assert!(matches!(result, Err(BookingError::Conflict)));
    }

    #[tokio::test]
    async fn test_initiate_rejects_unexpired_pending_hold() {
        let h = harness();
        let at = slot(&h);
        h.desk
            .initiate("mentor-1", "student-1", at, dec!(30))
            .await
            .unwrap();

        let result = h.desk.initiate("mentor-1", "student-2", at, dec!(30)).await;
        assert!(matches!(result, Err(BookingError::Conflict)));
    }

    #[tokio::test]
    async fn test_stale_pending_hold_does_not_block() {
        let h = harness();
        let at = h.clock.now() + Duration::days(5);
        h.desk
            .initiate("mentor-1", "student-1", at, dec!(30))
            .await
            .unwrap();

        // Payment window elapses without any sweep having run.
        h.clock.advance(Duration::hours(25));

        let result = h.desk.initiate("mentor-1", "student-2", at, dec!(30)).await;
        assert!(result.is_ok(), "expired hold must be treated as free");
    }

    #[tokio::test]
    async fn test_different_slot_or_mentor_never_conflicts() {
        let h = harness();
        let at = slot(&h);
        h.desk
            .initiate("mentor-1", "student-1", at, dec!(30))
            .await
            .unwrap();

        assert!(h.desk.initiate("mentor-2", "student-2", at, dec!(30)).await.is_ok());
        assert!(
            h.desk
                .initiate("mentor-1", "student-3", at + Duration::hours(1), dec!(30))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_no_record() {
        let h = harness();
        h.gateway.fail_initialize(true);

        let result = h
            .desk
            .initiate("mentor-1", "student-1", slot(&h), dec!(30))
            .await;
        assert!(matches!(result, Err(BookingError::Gateway(_))));
        assert!(h.sessions.all().await.unwrap().is_empty());

        // The slot is immediately bookable again.
        h.gateway.fail_initialize(false);
        assert!(
            h.desk
                .initiate("mentor-1", "student-2", slot(&h), dec!(30))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_settle_provisions_meeting_once() {
        let h = harness();
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", slot(&h), dec!(30))
            .await
            .unwrap();

        // Webhook and redirect callback both land.
        assert_eq!(
            h.desk.settle(booking.id).await.unwrap(),
            ReconcileOutcome::Applied
        );
        assert_eq!(
            h.desk.settle(booking.id).await.unwrap(),
            ReconcileOutcome::AlreadySettled
        );

        assert_eq!(h.meetings.calls(), 1);
        let stored = h.sessions.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MentorBookingStatus::Paid);
        assert!(stored.meeting_link.is_some());
        assert!(stored.payment_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_settle_notifies_both_parties() {
        let h = harness();
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", slot(&h), dec!(30))
            .await
            .unwrap();
        h.desk.settle(booking.id).await.unwrap();

        let sent = h.mailer.sent();
        assert!(
            sent.iter().any(|n| {
                n.template == NoticeTemplate::SessionConfirmedStudent && n.recipient == "student-1"
            })
        );
        assert!(
            sent.iter().any(|n| {
                n.template == NoticeTemplate::SessionConfirmedMentor && n.recipient == "mentor-1"
            })
        );
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_link_pending_not_error() {
        let h = harness();
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", slot(&h), dec!(30))
            .await
            .unwrap();
        h.meetings.fail(true);

        let outcome = h.desk.settle(booking.id).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let stored = h.sessions.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MentorBookingStatus::Paid);
        assert!(stored.meeting_link.is_none());
    }

    #[tokio::test]
    async fn test_expire_pending_session() {
        let h = harness();
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", h.clock.now() + Duration::days(5), dec!(30))
            .await
            .unwrap();

        assert!(
            h.desk
                .expire(booking.id, h.clock.now() + Duration::hours(25))
                .await
                .unwrap()
        );
        let stored = h.sessions.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MentorBookingStatus::Expired);

        // Late confirmation after expiry is acknowledged but not applied.
        let outcome = h.desk.settle(booking.id).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Ignored(_)));
        assert_eq!(h.meetings.calls(), 0);
    }

    #[tokio::test]
    async fn test_expire_paid_session_is_noop() {
        let h = harness();
        let (booking, _) = h
            .desk
            .initiate("mentor-1", "student-1", h.clock.now() + Duration::days(5), dec!(30))
            .await
            .unwrap();
        h.desk.settle(booking.id).await.unwrap();

        assert!(
            !h.desk
                .expire(booking.id, h.clock.now() + Duration::hours(25))
                .await
                .unwrap()
        );
        let stored = h.sessions.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MentorBookingStatus::Paid);
    }
}
