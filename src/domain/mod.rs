//! Domain entities, value objects, and the ports they are persisted and
//! reconciled through.

pub mod booking;
pub mod company;
pub mod mentorship;
pub mod ports;
pub mod reference;
