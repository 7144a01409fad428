use serde::Serialize;
use sqlx::types::Uuid;
use sqlx::PgPool;
use time::{Date, Duration, OffsetDateTime};

use crate::db::models::AppointmentStatus;
use crate::db::repositories::AppointmentRepository;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct AppointmentStatistics {
    pub from: Date,
    pub to: Date,
    pub total: i64,
    pub scheduled: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    pub rescheduled: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_total: Option<i64>,
}

/// Defaults to the trailing month ending today when either bound is missing.
pub fn resolve_range(from: Option<Date>, to: Option<Date>, today: Date) -> (Date, Date) {
    let to = to.unwrap_or(today);
    let from = from.unwrap_or_else(|| to.saturating_sub(Duration::days(30)));
    if from > to {
        (to, from)
    } else {
        (from, to)
    }
}

pub struct StatisticsService;

impl StatisticsService {
    pub async fn summarize(
        pool: &PgPool,
        from: Option<Date>,
        to: Option<Date>,
        doctor_id: Option<Uuid>,
    ) -> AppResult<AppointmentStatistics> {
        let (from, to) = resolve_range(from, to, OffsetDateTime::now_utc().date());

        let counts = AppointmentRepository::count_by_status_between(pool, from, to).await?;
        let lookup = |status: AppointmentStatus| -> i64 {
            counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        let doctor_total = match doctor_id {
            Some(doctor_id) => {
                Some(AppointmentRepository::count_for_doctor_between(pool, doctor_id, from, to).await?)
            }
            None => None,
        };

        Ok(AppointmentStatistics {
            from,
            to,
            total: counts.iter().map(|(_, n)| n).sum(),
            scheduled: lookup(AppointmentStatus::Scheduled),
            confirmed: lookup(AppointmentStatus::Confirmed),
            completed: lookup(AppointmentStatus::Completed),
            cancelled: lookup(AppointmentStatus::Cancelled),
            no_show: lookup(AppointmentStatus::NoShow),
            rescheduled: lookup(AppointmentStatus::Rescheduled),
            doctor_id,
            doctor_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn range_defaults_to_trailing_month() {
        let today = date!(2026 - 08 - 31);
        let (from, to) = resolve_range(None, None, today);
        assert_eq!(to, today);
        assert_eq!(from, date!(2026 - 08 - 01));
    }

    #[test]
    fn explicit_bounds_are_kept() {
        let (from, to) = resolve_range(
            Some(date!(2026 - 01 - 01)),
            Some(date!(2026 - 02 - 01)),
            date!(2026 - 08 - 31),
        );
        assert_eq!((from, to), (date!(2026 - 01 - 01), date!(2026 - 02 - 01)));
    }

    #[test]
    fn inverted_bounds_are_swapped() {
        let (from, to) = resolve_range(
            Some(date!(2026 - 03 - 01)),
            Some(date!(2026 - 02 - 01)),
            date!(2026 - 08 - 31),
        );
        assert!(from <= to);
    }
}
