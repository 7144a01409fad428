use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::macros::time;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "weekday", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn of(date: Date) -> Self {
        date.weekday().into()
    }
}

impl From<time::Weekday> for Weekday {
    fn from(day: time::Weekday) -> Self {
        match day {
            time::Weekday::Monday => Self::Monday,
            time::Weekday::Tuesday => Self::Tuesday,
            time::Weekday::Wednesday => Self::Wednesday,
            time::Weekday::Thursday => Self::Thursday,
            time::Weekday::Friday => Self::Friday,
            time::Weekday::Saturday => Self::Saturday,
            time::Weekday::Sunday => Self::Sunday,
        }
    }
}

/// A doctor's recurring window for one weekday. `Closed` covers both an
/// explicit unavailable rule and the absence of any rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayWindow {
    Open { start: Time, end: Time },
    Closed,
}

impl DayWindow {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// The window anchored to a concrete date, or `None` when closed.
    pub fn bounds_on(&self, date: Date) -> Option<(PrimitiveDateTime, PrimitiveDateTime)> {
        match *self {
            Self::Open { start, end } => Some((
                PrimitiveDateTime::new(date, start),
                PrimitiveDateTime::new(date, end),
            )),
            Self::Closed => None,
        }
    }

    /// Containment, not overlap: the whole requested interval must sit
    /// inside the window.
    pub fn covers(&self, date: Date, start: Time, duration: Duration) -> bool {
        match self.bounds_on(date) {
            Some((open, close)) => {
                let requested_start = PrimitiveDateTime::new(date, start);
                let requested_end = requested_start + duration;
                requested_start >= open && requested_end <= close
            }
            None => false,
        }
    }
}

/// Older schedule data marked a closed day as the `[00:00, 00:01)` interval
/// instead of a null window. Treat that marker as closed on read.
pub(crate) fn is_legacy_closed_marker(start: Time, end: Time) -> bool {
    start == time!(00:00) && end == time!(00:01)
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub weekday: Weekday,
    pub is_available: bool,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl WeeklyAvailability {
    pub fn window(&self) -> DayWindow {
        match (self.is_available, self.start_time, self.end_time) {
            (true, Some(start), Some(end)) if !is_legacy_closed_marker(start, end) => {
                DayWindow::Open { start, end }
            }
            _ => DayWindow::Closed,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AvailabilityUpsert {
    pub weekday: Weekday,
    pub is_available: bool,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
}

impl AvailabilityUpsert {
    /// Resolve the payload into a window. Open days need both bounds with
    /// `start < end`; closed days must not carry times.
    pub fn window(&self) -> Result<DayWindow, String> {
        if !self.is_available {
            if self.start_time.is_some() || self.end_time.is_some() {
                return Err("an unavailable day must not carry start or end times".to_string());
            }
            return Ok(DayWindow::Closed);
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start < end => Ok(DayWindow::Open { start, end }),
            (Some(_), Some(_)) => Err("start time must be before end time".to_string()),
            _ => Err("an available day requires start and end times".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn rule(is_available: bool, start: Option<Time>, end: Option<Time>) -> WeeklyAvailability {
        let now = OffsetDateTime::now_utc();
        WeeklyAvailability {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            weekday: Weekday::Monday,
            is_available,
            start_time: start,
            end_time: end,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_rule_maps_to_open_window() {
        let rule = rule(true, Some(time!(09:00)), Some(time!(17:00)));
        assert_eq!(
            rule.window(),
            DayWindow::Open {
                start: time!(09:00),
                end: time!(17:00),
            }
        );
    }

    #[test]
    fn unavailable_or_incomplete_rule_maps_to_closed() {
        assert_eq!(rule(false, None, None).window(), DayWindow::Closed);
        assert_eq!(
            rule(true, Some(time!(09:00)), None).window(),
            DayWindow::Closed
        );
    }

    #[test]
    fn legacy_marker_interval_reads_as_closed() {
        let rule = rule(true, Some(time!(00:00)), Some(time!(00:01)));
        assert_eq!(rule.window(), DayWindow::Closed);
    }

    #[test]
    fn covers_requires_containment_not_overlap() {
        let window = DayWindow::Open {
            start: time!(09:00),
            end: time!(17:00),
        };
        let day = date!(2026 - 09 - 07);

        assert!(window.covers(day, time!(09:00), Duration::minutes(30)));
        assert!(window.covers(day, time!(16:30), Duration::minutes(30)));
        // Straddling the close is refused even though it overlaps the window.
        assert!(!window.covers(day, time!(16:45), Duration::minutes(30)));
        assert!(!window.covers(day, time!(08:45), Duration::minutes(30)));
    }

    #[test]
    fn weekday_of_maps_calendar_dates() {
        assert_eq!(Weekday::of(date!(2026 - 09 - 07)), Weekday::Monday);
        assert_eq!(Weekday::of(date!(2026 - 09 - 13)), Weekday::Sunday);
    }

    #[test]
    fn upsert_validation_rejects_inconsistent_payloads() {
        let open = AvailabilityUpsert {
            weekday: Weekday::Monday,
            is_available: true,
            start_time: Some(time!(09:00)),
            end_time: Some(time!(17:00)),
        };
        assert!(open.window().is_ok());

        let inverted = AvailabilityUpsert {
            start_time: Some(time!(17:00)),
            end_time: Some(time!(09:00)),
            ..open.clone()
        };
        assert!(inverted.window().is_err());

        let missing_end = AvailabilityUpsert {
            end_time: None,
            ..open.clone()
        };
        assert!(missing_end.window().is_err());

        let closed_with_times = AvailabilityUpsert {
            is_available: false,
            ..open
        };
        assert!(closed_with_times.window().is_err());
    }
}
