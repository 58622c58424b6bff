use crate::domain::booking::Booking;
use crate::domain::company::Company;
use crate::domain::mentorship::MentorBooking;
use crate::error::Result;
use std::io::Write;

/// Writes the final ledger state as two CSV tables: bookings (both kinds),
/// then companies with their slot counters. Rows are sorted so replay output
/// is stable.
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_report(
        mut self,
        mut bookings: Vec<Booking>,
        mut sessions: Vec<MentorBooking>,
        mut companies: Vec<Company>,
    ) -> Result<()> {
        bookings.sort_by(|a, b| {
            (a.created_at, &a.student_id, &a.company_id)
                .cmp(&(b.created_at, &b.student_id, &b.company_id))
        });
        sessions.sort_by(|a, b| {
            (a.scheduled_at, &a.student_id, &a.mentor_id)
                .cmp(&(b.scheduled_at, &b.student_id, &b.mentor_id))
        });
        companies.sort_by(|a, b| a.id.cmp(&b.id));

        {
            let mut writer = csv::Writer::from_writer(&mut self.out);
            writer.write_record([
                "kind",
                "counterparty",
                "student",
                "status",
                "amount",
                "reference",
            ])?;
            for booking in &bookings {
                writer.write_record([
                    "internship",
                    &booking.company_id,
                    &booking.student_id,
                    &booking.status.to_string(),
                    &booking.amount.to_string(),
                    &booking
                        .payment_reference
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                ])?;
            }
            for session in &sessions {
                writer.write_record([
                    "mentorship",
                    &session.mentor_id,
                    &session.student_id,
                    &session.status.to_string(),
                    &session.amount.to_string(),
                    &session.payment_reference.to_string(),
                ])?;
            }
            writer.flush()?;
        }

        writeln!(self.out)?;

        let mut writer = csv::Writer::from_writer(&mut self.out);
        writer.write_record(["company", "name", "total_slots", "available_slots"])?;
        for company in &companies {
            writer.write_record([
                &company.id,
                &company.name,
                &company.total_slots.to_string(),
                &company.available_slots.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_report_layout() {
        let now = Utc::now();
        let mut booking = Booking::submit("acme", "s1", "cv/s1.pdf", dec!(50), now).unwrap();
        booking.approve(now).unwrap();
        let session =
            MentorBooking::initiate("m1", "s2", now + chrono::Duration::days(1), dec!(30), now)
                .unwrap();
        let company = Company::new("acme", "Acme Corp", 3);

        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer)
            .write_report(vec![booking], vec![session], vec![company])
            .unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("kind,counterparty,student,status,amount,reference"));
        assert!(text.contains("internship,acme,s1,approved,50,INT-"));
        assert!(text.contains("mentorship,m1,s2,pending,30,MNT-"));
        assert!(text.contains("company,name,total_slots,available_slots"));
        assert!(text.contains("acme,Acme Corp,3,3"));
    }
}
