//! Pure conflict/slot engine. Everything in here operates on value types so
//! the booking rules stay unit-testable without a database; the services
//! layer is responsible for loading the inputs and persisting the outcome.

mod conflict;
mod slots;

pub use conflict::{has_conflict, intervals_overlap};
pub use slots::{available_slots, SLOT_STEP};

use sqlx::types::Uuid;
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::db::models::{Appointment, DayWindow};

/// Why a requested slot was refused. Mapped onto the API error taxonomy by
/// the booking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDenial {
    /// Outside the doctor's open window, or the day is closed/unconfigured.
    NotAvailable,
    /// Overlaps an existing blocking appointment.
    SlotConflict,
}

/// Verdict for booking `[start, start + duration)` on a doctor's day.
/// Availability is a containment test against the weekday window; conflicts
/// use the half-open overlap test over blocking appointments.
pub fn check_slot(
    window: &DayWindow,
    existing: &[Appointment],
    date: Date,
    start: Time,
    duration_minutes: i32,
    exclude_id: Option<Uuid>,
) -> Result<(), SlotDenial> {
    let duration = Duration::minutes(i64::from(duration_minutes));
    if !window.covers(date, start, duration) {
        return Err(SlotDenial::NotAvailable);
    }

    let requested_start = PrimitiveDateTime::new(date, start);
    let requested_end = requested_start + duration;
    if has_conflict(existing, requested_start, requested_end, exclude_id) {
        return Err(SlotDenial::SlotConflict);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::types::Uuid;
    use time::{Date, OffsetDateTime, Time};

    use crate::db::models::{Appointment, AppointmentStatus, AppointmentType};

    pub fn appointment(
        date: Date,
        start_time: Time,
        duration_minutes: i32,
        status: AppointmentStatus,
    ) -> Appointment {
        let now = OffsetDateTime::now_utc();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date,
            start_time,
            duration_minutes,
            status,
            appointment_type: AppointmentType::Consultation,
            reason_for_visit: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::appointment;
    use super::*;
    use crate::db::models::AppointmentStatus;
    use time::macros::{date, time};

    const DAY: Date = date!(2026 - 09 - 07);

    fn open_day() -> DayWindow {
        DayWindow::Open {
            start: time!(09:00),
            end: time!(17:00),
        }
    }

    #[test]
    fn unconfigured_or_closed_day_fails_closed() {
        assert_eq!(
            check_slot(&DayWindow::Closed, &[], DAY, time!(10:00), 30, None),
            Err(SlotDenial::NotAvailable)
        );
    }

    #[test]
    fn slot_outside_the_window_is_not_available() {
        assert_eq!(
            check_slot(&open_day(), &[], DAY, time!(16:45), 30, None),
            Err(SlotDenial::NotAvailable)
        );
        assert_eq!(
            check_slot(&open_day(), &[], DAY, time!(08:30), 30, None),
            Err(SlotDenial::NotAvailable)
        );
    }

    #[test]
    fn overlapping_booking_is_refused_in_both_directions() {
        let first = appointment(DAY, time!(10:00), 30, AppointmentStatus::Scheduled);
        let second = appointment(DAY, time!(10:15), 30, AppointmentStatus::Scheduled);

        // Either one present blocks creating the other.
        assert_eq!(
            check_slot(&open_day(), &[first.clone()], DAY, second.start_time, 30, None),
            Err(SlotDenial::SlotConflict)
        );
        assert_eq!(
            check_slot(&open_day(), &[second], DAY, first.start_time, 30, None),
            Err(SlotDenial::SlotConflict)
        );
    }

    #[test]
    fn back_to_back_bookings_are_legal() {
        let existing = vec![appointment(DAY, time!(10:00), 30, AppointmentStatus::Scheduled)];
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(10:30), 30, None),
            Ok(())
        );
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(09:30), 30, None),
            Ok(())
        );
    }

    #[test]
    fn cancellation_frees_the_slot_for_rebooking() {
        let mut existing = vec![appointment(DAY, time!(10:00), 30, AppointmentStatus::Scheduled)];
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(10:00), 30, None),
            Err(SlotDenial::SlotConflict)
        );

        existing[0].status = AppointmentStatus::Cancelled;
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(10:00), 30, None),
            Ok(())
        );
    }

    #[test]
    fn reschedule_excludes_itself_but_not_third_parties() {
        let own = appointment(DAY, time!(10:00), 30, AppointmentStatus::Scheduled);
        let other = appointment(DAY, time!(11:00), 30, AppointmentStatus::Scheduled);
        let existing = vec![own.clone(), other.clone()];

        // Moving within its own old slot is fine.
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(10:15), 30, Some(own.id)),
            Ok(())
        );
        // Colliding with another appointment still conflicts.
        assert_eq!(
            check_slot(&open_day(), &existing, DAY, time!(11:15), 30, Some(own.id)),
            Err(SlotDenial::SlotConflict)
        );
    }
}
