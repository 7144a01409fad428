use time::{Date, Duration, Time};

use crate::db::models::{Appointment, DayWindow};
use crate::scheduling::conflict::has_conflict;

/// Candidate starts are walked on a fixed grid regardless of the requested
/// duration; a 45-minute visit still only starts on half-hour boundaries.
pub const SLOT_STEP: Duration = Duration::minutes(30);

/// Enumerate bookable start times for one doctor-day, ascending. Returns
/// nothing when the day is closed or has no rule. A candidate survives when
/// it fits inside the window and does not collide with a blocking
/// appointment.
pub fn available_slots(
    window: &DayWindow,
    existing: &[Appointment],
    date: Date,
    duration_minutes: i32,
) -> Vec<Time> {
    let Some((open, close)) = window.bounds_on(date) else {
        return Vec::new();
    };
    let duration = Duration::minutes(i64::from(duration_minutes));

    let mut slots = Vec::new();
    let mut candidate = open;
    while candidate + duration <= close {
        if !has_conflict(existing, candidate, candidate + duration, None) {
            slots.push(candidate.time());
        }
        candidate += SLOT_STEP;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AppointmentStatus;
    use crate::scheduling::testing::appointment;
    use time::macros::{date, time};

    const DAY: Date = date!(2026 - 09 - 07);

    fn window(start: Time, end: Time) -> DayWindow {
        DayWindow::Open { start, end }
    }

    #[test]
    fn full_day_with_no_bookings_yields_sixteen_half_hour_slots() {
        let slots = available_slots(&window(time!(09:00), time!(17:00)), &[], DAY, 30);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.first(), Some(&time!(09:00)));
        assert_eq!(slots.last(), Some(&time!(16:30)));
        assert!(slots.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn sixty_minute_visits_in_a_morning_window() {
        // Last viable start is 11:00 because 11:00 + 60min lands exactly on
        // the window end; 11:30 would spill past it.
        let slots = available_slots(&window(time!(09:00), time!(12:00)), &[], DAY, 60);
        assert_eq!(
            slots,
            vec![time!(09:00), time!(09:30), time!(10:00), time!(10:30), time!(11:00)]
        );
    }

    #[test]
    fn existing_booking_removes_only_colliding_starts() {
        let existing = vec![appointment(
            DAY,
            time!(09:00),
            30,
            AppointmentStatus::Scheduled,
        )];
        let slots = available_slots(&window(time!(08:30), time!(10:30)), &existing, DAY, 30);
        assert_eq!(slots, vec![time!(08:30), time!(09:30), time!(10:00)]);
    }

    #[test]
    fn cancelled_booking_does_not_remove_slots() {
        let existing = vec![appointment(
            DAY,
            time!(09:00),
            30,
            AppointmentStatus::Cancelled,
        )];
        let slots = available_slots(&window(time!(09:00), time!(10:00)), &existing, DAY, 30);
        assert_eq!(slots, vec![time!(09:00), time!(09:30)]);
    }

    #[test]
    fn closed_day_has_no_slots() {
        assert!(available_slots(&DayWindow::Closed, &[], DAY, 30).is_empty());
    }

    #[test]
    fn step_stays_fixed_for_longer_durations() {
        // 45-minute visits still start on half-hour boundaries.
        let slots = available_slots(&window(time!(09:00), time!(11:00)), &[], DAY, 45);
        assert_eq!(slots, vec![time!(09:00), time!(09:30), time!(10:00)]);
    }
}
