use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::company::Company;
use crate::domain::mentorship::{MentorBooking, MentorBookingStatus};
use crate::domain::reference::{BookingKind, PaymentReference};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub type BookingStoreRef = Arc<dyn BookingStore>;
pub type MentorBookingStoreRef = Arc<dyn MentorBookingStore>;
pub type CompanyStoreRef = Arc<dyn CompanyStore>;
pub type ExpiryQueueRef = Arc<dyn ExpiryQueue>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type MeetingProvisionerRef = Arc<dyn MeetingProvisioner>;
pub type MailerRef = Arc<dyn Mailer>;
pub type ClockRef = Arc<dyn Clock>;

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn find_by_reference(&self, reference: &PaymentReference) -> Result<Option<Booking>>;
    /// Persists `booking` only if the stored record still has status
    /// `expected`. Returns whether the write was applied; a `false` means a
    /// concurrent transition won and the caller's change must be dropped.
    async fn store_if_status(&self, booking: Booking, expected: BookingStatus) -> Result<bool>;
    async fn list_with_status(&self, status: BookingStatus) -> Result<Vec<Booking>>;
    async fn all(&self) -> Result<Vec<Booking>>;
}

#[async_trait]
pub trait MentorBookingStore: Send + Sync {
    /// Inserts the booking unless another record blocks the same
    /// mentor+timestamp at `now`. The conflict check and the insert happen
    /// under one write lock; returns whether the booking was stored.
    async fn insert_if_free(&self, booking: MentorBooking, now: DateTime<Utc>) -> Result<bool>;
    async fn get(&self, id: Uuid) -> Result<Option<MentorBooking>>;
    async fn remove(&self, id: Uuid) -> Result<()>;
    async fn find_by_reference(&self, reference: &PaymentReference)
    -> Result<Option<MentorBooking>>;
    /// Status-conditional write; see [`BookingStore::store_if_status`].
    async fn store_if_status(
        &self,
        booking: MentorBooking,
        expected: MentorBookingStatus,
    ) -> Result<bool>;
    async fn list_with_status(&self, status: MentorBookingStatus) -> Result<Vec<MentorBooking>>;
    async fn all(&self) -> Result<Vec<MentorBooking>>;
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn insert(&self, company: Company) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Company>>;
    /// Check-and-decrement of `available_slots` as one atomic
    /// read-modify-write. Fails with `SlotsExhausted` without mutating when no
    /// capacity remains.
    async fn reserve_slot(&self, id: &str) -> Result<()>;
    /// Compensating increment for a reservation whose payment setup failed.
    async fn release_slot(&self, id: &str) -> Result<()>;
    async fn all(&self) -> Result<Vec<Company>>;
}

/// A deferred expiry scheduled when a booking enters its payment window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryEntry {
    pub kind: BookingKind,
    pub booking_id: Uuid,
    pub due_at: DateTime<Utc>,
}

/// Timer queue for deferred expiries, keyed by booking id.
///
/// Entries are drained, not fired: the sweeper applies each one conditionally
/// against the booking's current status, so an entry that outlives a payment
/// is harmless.
#[async_trait]
pub trait ExpiryQueue: Send + Sync {
    async fn schedule(&self, entry: ExpiryEntry) -> Result<()>;
    /// Removes and returns every entry due at or before `now`.
    async fn drain_due(&self, now: DateTime<Utc>) -> Result<Vec<ExpiryEntry>>;
}

/// What the payment provider is asked to set up for a booking.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub reference: PaymentReference,
    pub amount: Decimal,
    pub payer: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    Pending,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registers the charge with the provider and returns the authorization
    /// URL the payer is sent to.
    async fn initialize(&self, request: ChargeRequest) -> Result<String>;
    /// Queries the provider for the charge outcome, used by the synchronous
    /// redirect path where no signed webhook body is available.
    async fn verify(&self, reference: &PaymentReference) -> Result<ChargeStatus>;
}

#[async_trait]
pub trait MeetingProvisioner: Send + Sync {
    /// Creates a joinable meeting for the mentor's session and returns its
    /// link. Failures are tolerated by callers ("link pending").
    async fn create_meeting(&self, mentor_id: &str, starts_at: DateTime<Utc>) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeTemplate {
    InternshipApproved,
    InternshipRejected,
    InternshipPaid,
    SessionConfirmedStudent,
    SessionConfirmedMentor,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub template: NoticeTemplate,
    pub recipient: String,
    pub booking_id: Uuid,
}

/// Fire-and-forget notification dispatch. Callers log failures and move on;
/// a notice never blocks or rolls back a state transition.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notice: Notice) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
