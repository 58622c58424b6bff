use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::company::Company;
use crate::domain::mentorship::{MentorBooking, MentorBookingStatus};
use crate::domain::ports::{
    BookingStore, CompanyStore, ExpiryEntry, ExpiryQueue, MentorBookingStore,
};
use crate::domain::reference::PaymentReference;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for internship bookings.
///
/// Uses `Arc<RwLock<HashMap<Uuid, Booking>>>` for shared concurrent access.
/// The status-conditional write holds the write lock across the compare and
/// the store, which is what makes it usable as a CAS guard.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<Uuid, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &PaymentReference) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| b.payment_reference.as_ref() == Some(reference))
            .cloned())
    }

    async fn store_if_status(&self, booking: Booking, expected: BookingStatus) -> Result<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get(&booking.id) {
            Some(current) if current.status == expected => {
                bookings.insert(booking.id, booking);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_with_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for mentorship session bookings.
///
/// `insert_if_free` runs the slot-conflict check and the insert under one
/// write lock so two concurrent initiations cannot both claim a slot.
#[derive(Default, Clone)]
pub struct InMemoryMentorBookingStore {
    sessions: Arc<RwLock<HashMap<Uuid, MentorBooking>>>,
}

impl InMemoryMentorBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MentorBookingStore for InMemoryMentorBookingStore {
    async fn insert_if_free(&self, booking: MentorBooking, now: DateTime<Utc>) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        let taken = sessions.values().any(|existing| {
            existing.mentor_id == booking.mentor_id
                && existing.scheduled_at == booking.scheduled_at
                && existing.blocks_slot(now)
        });
        if taken {
            return Ok(false);
        }
        sessions.insert(booking.id, booking);
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> Result<Option<MentorBooking>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id).cloned())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
        Ok(())
    }

    async fn find_by_reference(
        &self,
        reference: &PaymentReference,
    ) -> Result<Option<MentorBooking>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .find(|b| &b.payment_reference == reference)
            .cloned())
    }

    async fn store_if_status(
        &self,
        booking: MentorBooking,
        expected: MentorBookingStatus,
    ) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&booking.id) {
            Some(current) if current.status == expected => {
                sessions.insert(booking.id, booking);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_with_status(&self, status: MentorBookingStatus) -> Result<Vec<MentorBooking>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<MentorBooking>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for companies and their slot counters.
///
/// `reserve_slot` and `release_slot` take the write lock for the whole
/// read-modify-write, the equivalent of a row-level lock on the counter.
#[derive(Default, Clone)]
pub struct InMemoryCompanyStore {
    companies: Arc<RwLock<HashMap<String, Company>>>,
}

impl InMemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn insert(&self, company: Company) -> Result<()> {
        let mut companies = self.companies.write().await;
        companies.insert(company.id.clone(), company);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Company>> {
        let companies = self.companies.read().await;
        Ok(companies.get(id).cloned())
    }

    async fn reserve_slot(&self, id: &str) -> Result<()> {
        let mut companies = self.companies.write().await;
        let company = companies
            .get_mut(id)
            .ok_or_else(|| BookingError::NotFound(format!("company {id}")))?;
        company.reserve_slot()
    }

    async fn release_slot(&self, id: &str) -> Result<()> {
        let mut companies = self.companies.write().await;
        let company = companies
            .get_mut(id)
            .ok_or_else(|| BookingError::NotFound(format!("company {id}")))?;
        company.release_slot();
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Company>> {
        let companies = self.companies.read().await;
        Ok(companies.values().cloned().collect())
    }
}

/// In-memory deferred-expiry queue, ordered only at drain time.
#[derive(Default, Clone)]
pub struct InMemoryExpiryQueue {
    entries: Arc<RwLock<Vec<ExpiryEntry>>>,
}

impl InMemoryExpiryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ExpiryQueue for InMemoryExpiryQueue {
    async fn schedule(&self, entry: ExpiryEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn drain_due(&self, now: DateTime<Utc>) -> Result<Vec<ExpiryEntry>> {
        let mut entries = self.entries.write().await;
        let (due, rest): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|entry| entry.due_at <= now);
        *entries = rest;
        Ok(due)
    }
}
