use sqlx::postgres::PgExecutor;
use sqlx::types::Uuid;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::{Date, Time};

use crate::db::error::DatabaseError;
use crate::db::models::{Appointment, AppointmentStatus};

const COLUMNS: &str = "id, patient_id, doctor_id, appointment_date, start_time, \
     duration_minutes, status, appointment_type, reason_for_visit, notes, \
     created_by, created_at, updated_at, cancelled_by, cancelled_at, cancellation_reason";

const BLOCKING_STATUSES: &str =
    "ARRAY['scheduled','confirmed','rescheduled']::appointment_status[]";

/// Filters for the paginated admin/doctor listing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentFilter {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
}

/// Advisory lock key serializing writers for one doctor's calendar day.
/// Deterministic so every connection derives the same key for the same
/// `(doctor, date)` pair.
pub fn day_lock_key(doctor_id: Uuid, date: Date) -> i64 {
    let (hi, lo) = doctor_id.as_u64_pair();
    (hi ^ lo ^ date.to_julian_day() as u64) as i64
}

pub struct AppointmentRepository;

impl AppointmentRepository {
    /// Take the per-doctor-per-date advisory lock for the enclosing
    /// transaction, making the check-then-insert conflict test atomic
    /// against concurrent bookings for the same day.
    pub async fn lock_day(
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
        date: Date,
    ) -> Result<(), DatabaseError> {
        Self::lock_key(tx, day_lock_key(doctor_id, date)).await
    }

    pub async fn lock_key(
        tx: &mut Transaction<'_, Postgres>,
        key: i64,
    ) -> Result<(), DatabaseError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        appointment: &Appointment,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!(
            "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, \
             start_time, duration_minutes, status, appointment_type, reason_for_visit, \
             notes, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Appointment>(&sql)
            .bind(appointment.id)
            .bind(appointment.patient_id)
            .bind(appointment.doctor_id)
            .bind(appointment.date)
            .bind(appointment.start_time)
            .bind(appointment.duration_minutes)
            .bind(appointment.status)
            .bind(appointment.appointment_type)
            .bind(appointment.reason_for_visit.as_deref())
            .bind(appointment.notes.as_deref())
            .bind(appointment.created_by)
            .bind(appointment.created_at)
            .bind(appointment.updated_at)
            .fetch_one(&mut **tx)
            .await?;
        Ok(inserted)
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1");
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    /// Load and row-lock an appointment for a mutation.
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    /// Every appointment on a doctor's day, blocking or not; the engine
    /// decides which statuses occupy the calendar.
    pub async fn list_for_day(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
        date: Date,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE doctor_id = $1 AND appointment_date = $2 \
             ORDER BY start_time ASC"
        );
        let rows = sqlx::query_as::<_, Appointment>(&sql)
            .bind(doctor_id)
            .bind(date)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn search(
        executor: impl PgExecutor<'_> + Copy,
        filter: &AppointmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Appointment>, i64), DatabaseError> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM appointments WHERE 1=1"));
        apply_filter(&mut query, filter);
        query
            .push(" ORDER BY appointment_date ASC, start_time ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = query
            .build_query_as::<Appointment>()
            .fetch_all(executor)
            .await?;

        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM appointments WHERE 1=1");
        apply_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(executor).await?;

        Ok((rows, total))
    }

    pub async fn list_for_doctor(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
        date: Option<Date>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let rows = match date {
            Some(date) => Self::list_for_day(executor, doctor_id, date).await?,
            None => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM appointments WHERE doctor_id = $1 \
                     ORDER BY appointment_date ASC, start_time ASC"
                );
                sqlx::query_as::<_, Appointment>(&sql)
                    .bind(doctor_id)
                    .fetch_all(executor)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn list_for_patient(
        executor: impl PgExecutor<'_>,
        patient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM appointments WHERE patient_id = $1 \
             ORDER BY appointment_date DESC, start_time DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, Appointment>(&sql)
            .bind(patient_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn count_for_patient(
        executor: impl PgExecutor<'_>,
        patient_id: Uuid,
    ) -> Result<i64, DatabaseError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments WHERE patient_id = $1",
        )
        .bind(patient_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    pub async fn mark_cancelled(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        cancelled_by: Uuid,
        reason: &str,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!(
            "UPDATE appointments SET status = 'cancelled', cancelled_by = $2, \
             cancelled_at = now(), cancellation_reason = $3, updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .bind(cancelled_by)
            .bind(reason)
            .fetch_one(&mut **tx)
            .await?;
        Ok(updated)
    }

    pub async fn mark_rescheduled(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        new_date: Date,
        new_time: Time,
        notes: &str,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!(
            "UPDATE appointments SET appointment_date = $2, start_time = $3, \
             status = 'rescheduled', notes = $4, updated_at = now() \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .bind(new_date)
            .bind(new_time)
            .bind(notes)
            .fetch_one(&mut **tx)
            .await?;
        Ok(updated)
    }

    /// `notes` carries the caller's already-merged trail; `None` keeps the
    /// stored value untouched.
    pub async fn update_status(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> Result<Appointment, DatabaseError> {
        let sql = format!(
            "UPDATE appointments SET status = $2, notes = COALESCE($3, notes), \
             updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Appointment>(&sql)
            .bind(id)
            .bind(status)
            .bind(notes)
            .fetch_one(&mut **tx)
            .await?;
        Ok(updated)
    }

    pub async fn count_by_status_between(
        executor: impl PgExecutor<'_>,
        from: Date,
        to: Date,
    ) -> Result<Vec<(AppointmentStatus, i64)>, DatabaseError> {
        let rows = sqlx::query_as::<_, (AppointmentStatus, i64)>(
            "SELECT status, COUNT(*) FROM appointments \
             WHERE appointment_date BETWEEN $1 AND $2 GROUP BY status",
        )
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_doctor_between(
        executor: impl PgExecutor<'_>,
        doctor_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<i64, DatabaseError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = $1 \
             AND appointment_date BETWEEN $2 AND $3",
        )
        .bind(doctor_id)
        .bind(from)
        .bind(to)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Blocking appointments on `date` starting inside `[from, to]`, for the
    /// reminder sweep.
    pub async fn list_blocking_in_window(
        executor: impl PgExecutor<'_>,
        date: Date,
        from: Time,
        to: Time,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE status = ANY({BLOCKING_STATUSES}) \
             AND appointment_date = $1 AND start_time BETWEEN $2 AND $3 \
             ORDER BY start_time ASC"
        );
        let rows = sqlx::query_as::<_, Appointment>(&sql)
            .bind(date)
            .bind(from)
            .bind(to)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}

fn apply_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &AppointmentFilter) {
    if let Some(doctor_id) = filter.doctor_id {
        query.push(" AND doctor_id = ").push_bind(doctor_id);
    }
    if let Some(patient_id) = filter.patient_id {
        query.push(" AND patient_id = ").push_bind(patient_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(from_date) = filter.from_date {
        query.push(" AND appointment_date >= ").push_bind(from_date);
    }
    if let Some(to_date) = filter.to_date {
        query.push(" AND appointment_date <= ").push_bind(to_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn day_lock_key_is_stable_and_distinguishes_days() {
        let doctor = Uuid::new_v4();
        let monday = date!(2026 - 09 - 07);
        let tuesday = date!(2026 - 09 - 08);

        assert_eq!(day_lock_key(doctor, monday), day_lock_key(doctor, monday));
        assert_ne!(day_lock_key(doctor, monday), day_lock_key(doctor, tuesday));
        assert_ne!(
            day_lock_key(doctor, monday),
            day_lock_key(Uuid::new_v4(), monday)
        );
    }
}
