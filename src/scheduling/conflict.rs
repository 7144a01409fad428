use sqlx::types::Uuid;
use time::PrimitiveDateTime;

use crate::db::models::Appointment;

/// Half-open interval intersection. Equal boundaries do not intersect, so
/// back-to-back bookings are legal.
pub fn intervals_overlap(
    a_start: PrimitiveDateTime,
    a_end: PrimitiveDateTime,
    b_start: PrimitiveDateTime,
    b_end: PrimitiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// True if `[start, end)` collides with any blocking appointment in
/// `existing`. `exclude_id` skips the appointment being rescheduled so it
/// does not conflict with its own old slot.
pub fn has_conflict(
    existing: &[Appointment],
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    exclude_id: Option<Uuid>,
) -> bool {
    existing.iter().any(|appointment| {
        if Some(appointment.id) == exclude_id || !appointment.status.is_blocking() {
            return false;
        }
        intervals_overlap(start, end, appointment.start_at(), appointment.end_at())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AppointmentStatus;
    use crate::scheduling::testing::appointment;
    use time::macros::{date, time};
    use time::Date;

    const DAY: Date = date!(2026 - 09 - 07);

    fn at(hour: u8, minute: u8) -> PrimitiveDateTime {
        PrimitiveDateTime::new(DAY, time::Time::from_hms(hour, minute, 0).unwrap())
    }

    #[test]
    fn overlapping_intervals_are_detected_symmetrically() {
        let a = (at(10, 0), at(10, 30));
        let b = (at(10, 15), at(10, 45));
        assert!(intervals_overlap(a.0, a.1, b.0, b.1));
        assert!(intervals_overlap(b.0, b.1, a.0, a.1));
    }

    #[test]
    fn touching_boundaries_do_not_overlap() {
        assert!(!intervals_overlap(at(10, 0), at(10, 30), at(10, 30), at(11, 0)));
        assert!(!intervals_overlap(at(10, 30), at(11, 0), at(10, 0), at(10, 30)));
    }

    #[test]
    fn containment_counts_as_overlap() {
        assert!(intervals_overlap(at(9, 0), at(12, 0), at(10, 0), at(10, 30)));
    }

    #[test]
    fn conflict_scan_skips_non_blocking_statuses() {
        let existing = vec![
            appointment(DAY, time!(10:00), 30, AppointmentStatus::Cancelled),
            appointment(DAY, time!(10:00), 30, AppointmentStatus::Completed),
            appointment(DAY, time!(10:00), 30, AppointmentStatus::NoShow),
        ];
        assert!(!has_conflict(&existing, at(10, 0), at(10, 30), None));
    }

    #[test]
    fn conflict_scan_flags_blocking_statuses() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Rescheduled,
        ] {
            let existing = vec![appointment(DAY, time!(10:00), 30, status)];
            assert!(has_conflict(&existing, at(10, 15), at(10, 45), None));
        }
    }

    #[test]
    fn excluded_appointment_never_conflicts_with_itself() {
        let existing = vec![appointment(
            DAY,
            time!(10:00),
            30,
            AppointmentStatus::Scheduled,
        )];
        let own_id = existing[0].id;
        assert!(!has_conflict(&existing, at(10, 0), at(10, 30), Some(own_id)));
        assert!(has_conflict(&existing, at(10, 0), at(10, 30), None));
    }
}
