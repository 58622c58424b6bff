use crate::error::BookingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which booking flow a payment reference belongs to.
///
/// The provider echoes the reference back verbatim in webhooks and redirect
/// callbacks, so the kind is encoded into the reference itself and parsed out
/// exactly once at the boundary. Everything downstream dispatches on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingKind {
    Internship,
    Mentorship,
}

impl BookingKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Internship => "INT",
            Self::Mentorship => "MNT",
        }
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Internship => "internship",
            Self::Mentorship => "mentorship",
        })
    }
}

/// A unique string correlating a booking to a provider-side transaction.
///
/// Rendered as `<KIND>-<booking-uuid>-<entropy>`. The booking id is embedded
/// so a reference that fails direct lookup can still be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference {
    kind: BookingKind,
    booking_id: Uuid,
    entropy: String,
}

impl PaymentReference {
    pub fn generate(kind: BookingKind, booking_id: Uuid) -> Self {
        let entropy = Uuid::new_v4().simple().to_string()[..12].to_string();
        Self {
            kind,
            booking_id,
            entropy,
        }
    }

    pub fn kind(&self) -> BookingKind {
        self.kind
    }

    pub fn booking_id(&self) -> Uuid {
        self.booking_id
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            self.kind.prefix(),
            self.booking_id.simple(),
            self.entropy
        )
    }
}

impl FromStr for PaymentReference {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '-');
        let kind = match parts.next() {
            Some("INT") => BookingKind::Internship,
            Some("MNT") => BookingKind::Mentorship,
            _ => return Err(BookingError::UnknownReference(s.to_string())),
        };
        let booking_id = parts
            .next()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| BookingError::UnknownReference(s.to_string()))?;
        let entropy = parts
            .next()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| BookingError::UnknownReference(s.to_string()))?
            .to_string();
        Ok(Self {
            kind,
            booking_id,
            entropy,
        })
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentReference> for String {
    fn from(reference: PaymentReference) -> Self {
        reference.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_round_trip() {
        let id = Uuid::new_v4();
        let reference = PaymentReference::generate(BookingKind::Internship, id);
        let parsed: PaymentReference = reference.to_string().parse().unwrap();

        assert_eq!(parsed, reference);
        assert_eq!(parsed.kind(), BookingKind::Internship);
        assert_eq!(parsed.booking_id(), id);
    }

    #[test]
    fn test_mentorship_prefix() {
        let reference = PaymentReference::generate(BookingKind::Mentorship, Uuid::new_v4());
        assert!(reference.to_string().starts_with("MNT-"));
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let raw = format!("XYZ-{}-abcdef", Uuid::new_v4().simple());
        assert!(matches!(
            raw.parse::<PaymentReference>(),
            Err(BookingError::UnknownReference(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!("INT-not-a-uuid".parse::<PaymentReference>().is_err());
        assert!("".parse::<PaymentReference>().is_err());
        assert!(
            format!("INT-{}", Uuid::new_v4().simple())
                .parse::<PaymentReference>()
                .is_err(),
            "reference without entropy segment should be rejected"
        );
    }

    #[test]
    fn test_references_are_unique_per_generation() {
        let id = Uuid::new_v4();
        let a = PaymentReference::generate(BookingKind::Internship, id);
        let b = PaymentReference::generate(BookingKind::Internship, id);
        assert_ne!(a, b);
    }
}
