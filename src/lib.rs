//! Booking-lifecycle and payment-reconciliation core for a student
//! internship/mentorship marketplace.
//!
//! Companies post internship slots; students apply and pay through an
//! external payment provider; mentors sell one-on-one sessions. This crate
//! owns the part with real invariants: the booking state machines, the slot
//! and time-conflict guards, the idempotent reconciliation of provider
//! webhooks and redirect callbacks, and the expiry sweep that releases
//! payment windows that elapsed unpaid. Everything else (auth, uploads,
//! dashboards) is an external collaborator behind the ports in
//! [`domain::ports`].

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
