use crate::domain::ports::{
    ChargeRequest, ChargeStatus, Clock, Mailer, MeetingProvisioner, Notice, PaymentGateway,
};
use crate::domain::reference::PaymentReference;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock advanced by hand, for tests and script replay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A scripted payment gateway.
///
/// `initialize` fabricates a checkout URL unless told to fail; `verify`
/// answers with a per-reference verdict, defaulting to success. Used by the
/// CLI replay runner and as the test double everywhere a real provider would
/// sit.
#[derive(Default)]
pub struct StaticGateway {
    fail_initialize: AtomicBool,
    verdicts: Mutex<HashMap<String, ChargeStatus>>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_initialize(&self, fail: bool) {
        self.fail_initialize.store(fail, Ordering::SeqCst);
    }

    pub fn set_verdict(&self, reference: &PaymentReference, status: ChargeStatus) {
        let mut verdicts = self
            .verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        verdicts.insert(reference.to_string(), status);
    }
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    async fn initialize(&self, request: ChargeRequest) -> Result<String> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(BookingError::Gateway(
                "provider refused to initialize charge".to_string(),
            ));
        }
        Ok(format!("https://checkout.test/{}", request.reference))
    }

    async fn verify(&self, reference: &PaymentReference) -> Result<ChargeStatus> {
        let verdicts = self
            .verdicts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(verdicts
            .get(&reference.to_string())
            .copied()
            .unwrap_or(ChargeStatus::Success))
    }
}

/// Mailer that only logs. The production dispatch sits outside this core.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggedMailer;

#[async_trait]
impl Mailer for LoggedMailer {
    async fn send(&self, notice: Notice) -> Result<()> {
        debug!(
            template = ?notice.template,
            recipient = %notice.recipient,
            booking = %notice.booking_id,
            "notice queued"
        );
        Ok(())
    }
}

/// Mailer that records every notice, for assertions.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Notice>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, notice: Notice) -> Result<()> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push(notice);
        Ok(())
    }
}

/// Meeting provisioner that fabricates links and counts invocations, so tests
/// can assert a session was provisioned exactly once.
#[derive(Default)]
pub struct RecordingMeetingRoom {
    fail: AtomicBool,
    calls: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl RecordingMeetingRoom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl MeetingProvisioner for RecordingMeetingRoom {
    async fn create_meeting(&self, mentor_id: &str, starts_at: DateTime<Utc>) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BookingError::Gateway(
                "calendar API unavailable".to_string(),
            ));
        }
        let mut calls = self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        calls.push((mentor_id.to_string(), starts_at));
        Ok(format!(
            "https://meet.test/{}/{}",
            mentor_id,
            Uuid::new_v4().simple()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::BookingKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), start + Duration::hours(3));
    }

    #[tokio::test]
    async fn test_static_gateway_verdicts() {
        let gateway = StaticGateway::new();
        let reference = PaymentReference::generate(BookingKind::Internship, Uuid::new_v4());

        assert_eq!(
            gateway.verify(&reference).await.unwrap(),
            ChargeStatus::Success
        );
        gateway.set_verdict(&reference, ChargeStatus::Failed);
        assert_eq!(
            gateway.verify(&reference).await.unwrap(),
            ChargeStatus::Failed
        );

        let request = ChargeRequest {
            reference,
            amount: dec!(10),
            payer: "s1".to_string(),
            callback_url: "https://example.test/cb".to_string(),
        };
        gateway.fail_initialize(true);
        assert!(gateway.initialize(request).await.is_err());
    }
}
