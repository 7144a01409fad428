use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that occupy the doctor's calendar for conflict purposes.
    /// Cancelled, completed, and no-show appointments free their slot.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed | Self::Rescheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        };
        f.write_str(name)
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "no_show" => Ok(Self::NoShow),
            "rescheduled" => Ok(Self::Rescheduled),
            _ => Err(format!("unknown appointment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "appointment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    FollowUp,
    Emergency,
    CheckUp,
    Procedure,
    Surgery,
    Vaccination,
    Therapy,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[sqlx(rename = "appointment_date")]
    pub date: Date,
    pub start_time: Time,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub appointment_type: AppointmentType,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<OffsetDateTime>,
    pub cancellation_reason: Option<String>,
}

impl Appointment {
    pub fn from_request(payload: &NewAppointment, patient_id: Uuid, created_by: Uuid) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: payload.doctor_id,
            date: payload.date,
            start_time: payload.start_time,
            duration_minutes: payload.duration_minutes,
            status: AppointmentStatus::Scheduled,
            appointment_type: payload.appointment_type,
            reason_for_visit: payload.reason_for_visit.clone(),
            notes: payload.notes.clone(),
            created_by,
            created_at: now,
            updated_at: now,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    pub fn start_at(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(self.date, self.start_time)
    }

    /// Derived, not stored: `date + time + duration`.
    pub fn end_at(&self) -> PrimitiveDateTime {
        self.start_at() + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    pub fn can_be_rescheduled(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

fn default_duration_minutes() -> i32 {
    30
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAppointment {
    pub doctor_id: Uuid,
    /// Defaults to the authenticated caller when absent (patients book for
    /// themselves; admins may book on a patient's behalf).
    pub patient_id: Option<Uuid>,
    pub date: Date,
    pub start_time: Time,
    #[serde(default = "default_duration_minutes")]
    #[validate(range(min = 15, max = 480, message = "duration must be 15-480 minutes"))]
    pub duration_minutes: i32,
    #[serde(default)]
    pub appointment_type: AppointmentType,
    #[validate(length(max = 1000, message = "reason for visit must not exceed 1000 characters"))]
    pub reason_for_visit: Option<String>,
    #[validate(length(max = 2000, message = "notes must not exceed 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelAppointment {
    #[validate(length(min = 1, max = 500, message = "cancellation reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RescheduleAppointment {
    pub new_date: Date,
    pub new_time: Time,
    #[validate(length(min = 1, max = 500, message = "reschedule reason must be 1-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAppointmentStatus {
    pub status: String,
    #[validate(length(max = 2000, message = "notes must not exceed 2000 characters"))]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn appointment_with_status(status: AppointmentStatus) -> Appointment {
        let now = OffsetDateTime::now_utc();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date: date!(2026 - 09 - 07),
            start_time: time!(10:00),
            duration_minutes: 30,
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

    #[test]
    fn only_scheduled_and_confirmed_can_be_cancelled() {
        assert!(appointment_with_status(AppointmentStatus::Scheduled).can_be_cancelled());
        assert!(appointment_with_status(AppointmentStatus::Confirmed).can_be_cancelled());
        assert!(!appointment_with_status(AppointmentStatus::Cancelled).can_be_cancelled());
        assert!(!appointment_with_status(AppointmentStatus::Completed).can_be_cancelled());
        assert!(!appointment_with_status(AppointmentStatus::NoShow).can_be_cancelled());
        assert!(!appointment_with_status(AppointmentStatus::Rescheduled).can_be_cancelled());
    }

    #[test]
    fn only_scheduled_and_confirmed_can_be_rescheduled() {
        assert!(appointment_with_status(AppointmentStatus::Scheduled).can_be_rescheduled());
        assert!(appointment_with_status(AppointmentStatus::Confirmed).can_be_rescheduled());
        assert!(!appointment_with_status(AppointmentStatus::Rescheduled).can_be_rescheduled());
        assert!(!appointment_with_status(AppointmentStatus::Completed).can_be_rescheduled());
    }

    #[test]
    fn rescheduled_still_blocks_the_calendar() {
        assert!(AppointmentStatus::Scheduled.is_blocking());
        assert!(AppointmentStatus::Confirmed.is_blocking());
        assert!(AppointmentStatus::Rescheduled.is_blocking());
        assert!(!AppointmentStatus::Cancelled.is_blocking());
        assert!(!AppointmentStatus::Completed.is_blocking());
        assert!(!AppointmentStatus::NoShow.is_blocking());
    }

    #[test]
    fn end_time_is_derived_from_duration() {
        let mut appointment = appointment_with_status(AppointmentStatus::Scheduled);
        appointment.duration_minutes = 45;
        assert_eq!(
            appointment.end_at(),
            PrimitiveDateTime::new(date!(2026 - 09 - 07), time!(10:45))
        );
    }

    #[test]
    fn status_parsing_accepts_known_values_case_insensitively() {
        assert_eq!(
            "SCHEDULED".parse::<AppointmentStatus>(),
            Ok(AppointmentStatus::Scheduled)
        );
        assert_eq!(
            "no_show".parse::<AppointmentStatus>(),
            Ok(AppointmentStatus::NoShow)
        );
        assert!("postponed".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn status_display_round_trips_through_parse() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ] {
            assert_eq!(status.to_string().parse::<AppointmentStatus>(), Ok(status));
        }
    }
}
