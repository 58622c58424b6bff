use crate::error::{BookingError, Result};
use serde::{Deserialize, Serialize};

/// A company offering a finite number of internship slots.
///
/// Invariant: `0 <= available_slots <= total_slots`. The counter is only ever
/// mutated through [`reserve_slot`](Self::reserve_slot) and
/// [`release_slot`](Self::release_slot); adapters must call these under a
/// single write lock so a check never races a decrement.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub total_slots: u32,
    pub available_slots: u32,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_slots: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_slots,
            available_slots: total_slots,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.available_slots > 0
    }

    /// Consumes one slot, failing without mutation when none remain.
    pub fn reserve_slot(&mut self) -> Result<()> {
        if self.available_slots == 0 {
            return Err(BookingError::SlotsExhausted(self.id.clone()));
        }
        self.available_slots -= 1;
        Ok(())
    }

    /// Returns a slot reserved by an approval whose payment setup failed.
    /// Capped at `total_slots` so a stray release cannot mint capacity.
    pub fn release_slot(&mut self) {
        if self.available_slots < self.total_slots {
            self.available_slots += 1;
        }
    }
}
