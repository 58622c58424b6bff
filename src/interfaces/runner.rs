use crate::application::ledger::InternshipLedger;
use crate::application::mentorship::MentorshipDesk;
use crate::application::reconciler::{WebhookReconciler, sign_payload};
use crate::application::sweeper::ExpirySweeper;
use crate::domain::company::Company;
use crate::domain::ports::{BookingStore, ClockRef, CompanyStore, MentorBookingStore};
use crate::domain::reference::PaymentReference;
use crate::error::{BookingError, Result};
use crate::infrastructure::collaborators::{
    LoggedMailer, ManualClock, RecordingMeetingRoom, StaticGateway,
};
use crate::infrastructure::in_memory::{
    InMemoryBookingStore, InMemoryCompanyStore, InMemoryExpiryQueue, InMemoryMentorBookingStore,
};
use crate::interfaces::report::ReportWriter;
use crate::interfaces::script::Command;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use uuid::Uuid;

struct LabelEntry {
    id: Uuid,
    reference: Option<PaymentReference>,
}

/// Replays a script against a fresh in-memory deployment of the core, with a
/// manually-advanced clock and a scripted payment gateway. Webhook commands
/// are signed with the configured secret, exercising the real verification
/// path.
pub struct ScriptRunner {
    ledger: Arc<InternshipLedger>,
    desk: Arc<MentorshipDesk>,
    reconciler: WebhookReconciler,
    sweeper: ExpirySweeper,
    bookings: Arc<InMemoryBookingStore>,
    sessions: Arc<InMemoryMentorBookingStore>,
    companies: Arc<InMemoryCompanyStore>,
    clock: Arc<ManualClock>,
    secret: String,
    labels: HashMap<String, LabelEntry>,
}

impl ScriptRunner {
    pub fn new(secret: impl Into<String>, start: DateTime<Utc>) -> Self {
        let secret = secret.into();
        let bookings = Arc::new(InMemoryBookingStore::new());
        let sessions = Arc::new(InMemoryMentorBookingStore::new());
        let companies = Arc::new(InMemoryCompanyStore::new());
        let expiries = Arc::new(InMemoryExpiryQueue::new());
        let gateway = Arc::new(StaticGateway::new());
        let manual_clock = Arc::new(ManualClock::starting_at(start));
        let clock: ClockRef = manual_clock.clone();

        let ledger = Arc::new(InternshipLedger::new(
            bookings.clone(),
            companies.clone(),
            expiries.clone(),
            gateway.clone(),
            Arc::new(LoggedMailer),
            clock.clone(),
            "https://example.test/payments/callback",
        ));
        let desk = Arc::new(MentorshipDesk::new(
            sessions.clone(),
            expiries.clone(),
            gateway.clone(),
            Arc::new(RecordingMeetingRoom::new()),
            Arc::new(LoggedMailer),
            clock.clone(),
            "https://example.test/payments/callback",
        ));
        let reconciler = WebhookReconciler::new(
            ledger.clone(),
            desk.clone(),
            bookings.clone(),
            sessions.clone(),
            gateway.clone(),
            secret.clone(),
        );
        let sweeper = ExpirySweeper::new(
            ledger.clone(),
            desk.clone(),
            bookings.clone(),
            sessions.clone(),
            expiries,
            clock,
        );

        Self {
            ledger,
            desk,
            reconciler,
            sweeper,
            bookings,
            sessions,
            companies,
            clock: manual_clock,
            secret,
            labels: HashMap::new(),
        }
    }

    pub async fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SeedCompany { id, name, slots } => {
                let name = name.unwrap_or_else(|| id.clone());
                self.companies.insert(Company::new(id, name, slots)).await
            }
            Command::Submit {
                label,
                company,
                student,
                cv,
                amount,
            } => {
                let booking = self.ledger.submit(&company, &student, &cv, amount).await?;
                self.labels.insert(
                    label,
                    LabelEntry {
                        id: booking.id,
                        reference: None,
                    },
                );
                Ok(())
            }
            Command::Approve { label } => {
                let id = self.lookup(&label)?.id;
                let approved = self.ledger.approve(id).await?;
                if let Some(entry) = self.labels.get_mut(&label) {
                    entry.reference = approved.payment_reference;
                }
                Ok(())
            }
            Command::Reject { label, reason } => {
                let id = self.lookup(&label)?.id;
                self.ledger.reject(id, &reason).await?;
                Ok(())
            }
            Command::Initiate {
                label,
                mentor,
                student,
                at,
                amount,
            } => {
                let (booking, _url) = self.desk.initiate(&mentor, &student, at, amount).await?;
                self.labels.insert(
                    label,
                    LabelEntry {
                        id: booking.id,
                        reference: Some(booking.payment_reference),
                    },
                );
                Ok(())
            }
            Command::Webhook { label, event } => {
                let entry = self.lookup(&label)?;
                let reference = entry.reference.clone().ok_or_else(|| {
                    BookingError::Validation(format!("booking '{label}' has no payment reference"))
                })?;
                let body = json!({
                    "event": event,
                    "data": {
                        "reference": reference.to_string(),
                        "id": 1,
                        "metadata": { "booking_id": entry.id },
                    }
                });
                let body = serde_json::to_vec(&body)?;
                let signature = sign_payload(&self.secret, &body);
                self.reconciler.process_webhook(&body, &signature).await?;
                Ok(())
            }
            Command::Confirm { label } => {
                let entry = self.lookup(&label)?;
                let reference = entry.reference.clone().ok_or_else(|| {
                    BookingError::Validation(format!("booking '{label}' has no payment reference"))
                })?;
                self.reconciler
                    .confirm_redirect(&reference.to_string())
                    .await?;
                Ok(())
            }
            Command::AdvanceTime { hours } => {
                self.clock.advance(Duration::hours(hours));
                Ok(())
            }
            Command::Sweep => {
                self.sweeper.sweep().await?;
                Ok(())
            }
        }
    }

    /// Writes the final ledger state to `out` as CSV.
    pub async fn report<W: Write>(&self, out: W) -> Result<()> {
        ReportWriter::new(out).write_report(
            self.bookings.all().await?,
            self.sessions.all().await?,
            self.companies.all().await?,
        )
    }

    fn lookup(&self, label: &str) -> Result<&LabelEntry> {
        self.labels
            .get(label)
            .ok_or_else(|| BookingError::Validation(format!("unknown booking label '{label}'")))
    }
}
