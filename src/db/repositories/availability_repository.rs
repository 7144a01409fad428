use sqlx::postgres::PgExecutor;
use sqlx::types::Uuid;
use sqlx::{Postgres, Transaction};
use time::Time;

use crate::db::error::DatabaseError;
use crate::db::models::{DayWindow, Weekday, WeeklyAvailability};

const COLUMNS: &str =
    "id, doctor_id, weekday, is_available, start_time, end_time, created_at, updated_at";

fn window_columns(window: &DayWindow) -> (bool, Option<Time>, Option<Time>) {
    match *window {
        DayWindow::Open { start, end } => (true, Some(start), Some(end)),
        DayWindow::Closed => (false, None, None),
    }
}

pub struct AvailabilityRepository;

impl AvailabilityRepository {
    /// The single recurring rule for `(doctor, weekday)`, if one is
    /// configured. Absence means the day is fully unavailable.
    pub async fn find_rule(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
        weekday: Weekday,
    ) -> Result<Option<WeeklyAvailability>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM weekly_availability \
             WHERE doctor_id = $1 AND weekday = $2"
        );
        let rule = sqlx::query_as::<_, WeeklyAvailability>(&sql)
            .bind(doctor_id)
            .bind(weekday)
            .fetch_optional(executor)
            .await?;
        Ok(rule)
    }

    pub async fn list_for_doctor(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
    ) -> Result<Vec<WeeklyAvailability>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM weekly_availability \
             WHERE doctor_id = $1 ORDER BY weekday ASC"
        );
        let rules = sqlx::query_as::<_, WeeklyAvailability>(&sql)
            .bind(doctor_id)
            .fetch_all(executor)
            .await?;
        Ok(rules)
    }

    /// Insert or replace the rule for `(doctor, weekday)`.
    pub async fn upsert(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
        weekday: Weekday,
        window: &DayWindow,
    ) -> Result<WeeklyAvailability, DatabaseError> {
        let (is_available, start_time, end_time) = window_columns(window);
        let sql = format!(
            "INSERT INTO weekly_availability \
             (doctor_id, weekday, is_available, start_time, end_time) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (doctor_id, weekday) DO UPDATE SET \
             is_available = EXCLUDED.is_available, \
             start_time = EXCLUDED.start_time, \
             end_time = EXCLUDED.end_time, \
             updated_at = now() \
             RETURNING {COLUMNS}"
        );
        let saved = sqlx::query_as::<_, WeeklyAvailability>(&sql)
            .bind(doctor_id)
            .bind(weekday)
            .bind(is_available)
            .bind(start_time)
            .bind(end_time)
            .fetch_one(executor)
            .await?;
        Ok(saved)
    }

    /// Drop every rule for a doctor; used by the full weekly replace.
    pub async fn clear_for_doctor(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
    ) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM weekly_availability WHERE doctor_id = $1")
            .bind(doctor_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
