use chrono::{DateTime, Utc};
use slotledger::application::ledger::InternshipLedger;
use slotledger::application::mentorship::MentorshipDesk;
use slotledger::application::reconciler::WebhookReconciler;
use slotledger::application::sweeper::ExpirySweeper;
use slotledger::domain::company::Company;
use slotledger::domain::ports::{ClockRef, CompanyStore};
use slotledger::infrastructure::collaborators::{
    ManualClock, RecordingMailer, RecordingMeetingRoom, StaticGateway,
};
use slotledger::infrastructure::in_memory::{
    InMemoryBookingStore, InMemoryCompanyStore, InMemoryExpiryQueue, InMemoryMentorBookingStore,
};
use std::sync::Arc;

pub const SECRET: &str = "integration-secret";

/// A fully wired in-memory deployment of the booking core.
pub struct Deployment {
    pub ledger: Arc<InternshipLedger>,
    pub desk: Arc<MentorshipDesk>,
    pub reconciler: WebhookReconciler,
    pub sweeper: ExpirySweeper,
    pub bookings: Arc<InMemoryBookingStore>,
    pub sessions: Arc<InMemoryMentorBookingStore>,
    pub companies: Arc<InMemoryCompanyStore>,
    pub expiries: Arc<InMemoryExpiryQueue>,
    pub gateway: Arc<StaticGateway>,
    pub meetings: Arc<RecordingMeetingRoom>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
}

pub fn deployment() -> Deployment {
    let bookings = Arc::new(InMemoryBookingStore::new());
    let sessions = Arc::new(InMemoryMentorBookingStore::new());
    let companies = Arc::new(InMemoryCompanyStore::new());
    let expiries = Arc::new(InMemoryExpiryQueue::new());
    let gateway = Arc::new(StaticGateway::new());
    let meetings = Arc::new(RecordingMeetingRoom::new());
    let mailer = Arc::new(RecordingMailer::new());
    let manual_clock = Arc::new(ManualClock::default());
    let clock: ClockRef = manual_clock.clone();

    let ledger = Arc::new(InternshipLedger::new(
        bookings.clone(),
        companies.clone(),
        expiries.clone(),
        gateway.clone(),
        mailer.clone(),
        clock.clone(),
        "https://example.test/payments/callback",
    ));
    let desk = Arc::new(MentorshipDesk::new(
        sessions.clone(),
        expiries.clone(),
        gateway.clone(),
        meetings.clone(),
        mailer.clone(),
        clock.clone(),
        "https://example.test/payments/callback",
    ));
    let reconciler = WebhookReconciler::new(
        ledger.clone(),
        desk.clone(),
        bookings.clone(),
        sessions.clone(),
        gateway.clone(),
        SECRET,
    );
    let sweeper = ExpirySweeper::new(
        ledger.clone(),
        desk.clone(),
        bookings.clone(),
        sessions.clone(),
        expiries.clone(),
        clock,
    );

    Deployment {
        ledger,
        desk,
        reconciler,
        sweeper,
        bookings,
        sessions,
        companies,
        expiries,
        gateway,
        meetings,
        mailer,
        clock: manual_clock,
    }
}

impl Deployment {
    pub async fn seed_company(&self, id: &str, slots: u32) {
        self.companies
            .insert(Company::new(id, id, slots))
            .await
            .unwrap();
    }

    pub async fn available_slots(&self, id: &str) -> u32 {
        self.companies
            .get(id)
            .await
            .unwrap()
            .unwrap()
            .available_slots
    }

    pub fn now(&self) -> DateTime<Utc> {
        use slotledger::domain::ports::Clock;
        self.clock.now()
    }
}

/// Builds the signed webhook body the provider would deliver for a reference.
pub fn charge_success_body(reference: &str, booking_id: Option<uuid::Uuid>) -> Vec<u8> {
    let body = serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "id": 7001,
            "metadata": { "booking_id": booking_id },
        }
    });
    serde_json::to_vec(&body).unwrap()
}
