use serde_json::json;
use sqlx::types::Uuid;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::info;
use validator::Validate;

use crate::db::models::{
    Appointment, AppointmentStatus, CancelAppointment, DayWindow, NewAppointment,
    RescheduleAppointment, UpdateAppointmentStatus, Weekday,
};
use crate::db::repositories::{day_lock_key, AppointmentRepository, AvailabilityRepository};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::events::{topics, EventSink};
use crate::identity::AuthContext;
use crate::scheduling::{self, SlotDenial};

const STAFF_ROLES: &[&str] = &["ADMIN", "DOCTOR"];

/// Patients may only book for themselves; staff may book on a patient's
/// behalf.
fn require_booking_for(ctx: &AuthContext, patient_id: Uuid) -> AppResult<()> {
    if patient_id == ctx.user_id || ctx.has_any_role(STAFF_ROLES) {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "booking on behalf of another patient requires ADMIN or DOCTOR role".to_string(),
        ))
    }
}

/// Notes are an append-only trail; new entries never overwrite what is
/// already there.
fn append_note(existing: Option<&str>, addition: &str) -> String {
    match existing {
        Some(existing) => format!("{}\n{}", existing, addition),
        None => addition.to_string(),
    }
}

fn denial_to_error(denial: SlotDenial) -> AppError {
    match denial {
        SlotDenial::NotAvailable => {
            AppError::NotAvailable("requested interval is outside the doctor's open hours".into())
        }
        SlotDenial::SlotConflict => {
            AppError::SlotConflict("requested slot overlaps an existing appointment".into())
        }
    }
}

fn require_future_date(date: time::Date) -> AppResult<()> {
    if date <= OffsetDateTime::now_utc().date() {
        return Err(AppError::Validation(
            "appointment date must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Orchestrates the four booking mutations. Each runs inside one transaction
/// under the per-doctor-per-date advisory lock, so the check-then-act
/// conflict test is atomic; events go out only after commit.
pub struct BookingService;

impl BookingService {
    pub async fn create(
        pool: &PgPool,
        events: &EventSink,
        ctx: &AuthContext,
        payload: NewAppointment,
    ) -> AppResult<Appointment> {
        payload.validate()?;
        require_future_date(payload.date)?;

        let patient_id = payload.patient_id.unwrap_or(ctx.user_id);
        require_booking_for(ctx, patient_id)?;

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        AppointmentRepository::lock_day(&mut tx, payload.doctor_id, payload.date).await?;

        let window = AvailabilityRepository::find_rule(
            &mut *tx,
            payload.doctor_id,
            Weekday::of(payload.date),
        )
        .await?
        .map(|rule| rule.window())
        .unwrap_or(DayWindow::Closed);

        let existing =
            AppointmentRepository::list_for_day(&mut *tx, payload.doctor_id, payload.date).await?;
        scheduling::check_slot(
            &window,
            &existing,
            payload.date,
            payload.start_time,
            payload.duration_minutes,
            None,
        )
        .map_err(denial_to_error)?;

        let appointment = Appointment::from_request(&payload, patient_id, ctx.user_id);
        let created = AppointmentRepository::insert(&mut tx, &appointment).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        events.publish(
            topics::BOOKED,
            json!({
                "appointment_id": created.id,
                "patient_id": created.patient_id,
                "doctor_id": created.doctor_id,
                "date": created.date,
                "time": created.start_time,
                "appointment_type": created.appointment_type,
            }),
        );
        info!(appointment_id = %created.id, doctor_id = %created.doctor_id, "appointment booked");
        Ok(created)
    }

    pub async fn cancel(
        pool: &PgPool,
        events: &EventSink,
        ctx: &AuthContext,
        id: Uuid,
        payload: CancelAppointment,
    ) -> AppResult<Appointment> {
        payload.validate()?;

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        let appointment = AppointmentRepository::find_by_id_for_update(&mut tx, id).await?;
        AppointmentRepository::lock_day(&mut tx, appointment.doctor_id, appointment.date).await?;

        if !appointment.can_be_cancelled() {
            return Err(AppError::State(format!(
                "appointment in status {} cannot be cancelled",
                appointment.status
            )));
        }

        let cancelled =
            AppointmentRepository::mark_cancelled(&mut tx, id, ctx.user_id, &payload.reason)
                .await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        events.publish(
            topics::CANCELLED,
            json!({
                "appointment_id": cancelled.id,
                "patient_id": cancelled.patient_id,
                "doctor_id": cancelled.doctor_id,
                "cancellation_reason": cancelled.cancellation_reason,
                "cancelled_by": cancelled.cancelled_by,
                "cancelled_at": cancelled.cancelled_at,
            }),
        );
        info!(appointment_id = %cancelled.id, "appointment cancelled");
        Ok(cancelled)
    }

    pub async fn reschedule(
        pool: &PgPool,
        events: &EventSink,
        ctx: &AuthContext,
        id: Uuid,
        payload: RescheduleAppointment,
    ) -> AppResult<Appointment> {
        payload.validate()?;
        require_future_date(payload.new_date)?;

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        let appointment = AppointmentRepository::find_by_id_for_update(&mut tx, id).await?;

        // Both the vacated day and the target day are serialized, in sorted
        // key order so concurrent reschedules cannot deadlock.
        let mut keys = [
            day_lock_key(appointment.doctor_id, appointment.date),
            day_lock_key(appointment.doctor_id, payload.new_date),
        ];
        keys.sort_unstable();
        for key in keys {
            AppointmentRepository::lock_key(&mut tx, key).await?;
        }

        if !appointment.can_be_rescheduled() {
            return Err(AppError::State(format!(
                "appointment in status {} cannot be rescheduled",
                appointment.status
            )));
        }

        let window = AvailabilityRepository::find_rule(
            &mut *tx,
            appointment.doctor_id,
            Weekday::of(payload.new_date),
        )
        .await?
        .map(|rule| rule.window())
        .unwrap_or(DayWindow::Closed);

        let existing = AppointmentRepository::list_for_day(
            &mut *tx,
            appointment.doctor_id,
            payload.new_date,
        )
        .await?;
        scheduling::check_slot(
            &window,
            &existing,
            payload.new_date,
            payload.new_time,
            appointment.duration_minutes,
            Some(appointment.id),
        )
        .map_err(denial_to_error)?;

        let notes = append_note(
            appointment.notes.as_deref(),
            &format!("Rescheduled: {}", payload.reason),
        );
        let rescheduled = AppointmentRepository::mark_rescheduled(
            &mut tx,
            id,
            payload.new_date,
            payload.new_time,
            &notes,
        )
        .await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        events.publish(
            topics::RESCHEDULED,
            json!({
                "appointment_id": rescheduled.id,
                "new_date": rescheduled.date,
                "new_time": rescheduled.start_time,
                "reason": payload.reason,
                "rescheduled_by": ctx.user_id,
            }),
        );
        info!(appointment_id = %rescheduled.id, "appointment rescheduled");
        Ok(rescheduled)
    }

    pub async fn update_status(
        pool: &PgPool,
        events: &EventSink,
        ctx: &AuthContext,
        id: Uuid,
        payload: UpdateAppointmentStatus,
    ) -> AppResult<Appointment> {
        payload.validate()?;
        let status = payload
            .status
            .parse::<AppointmentStatus>()
            .map_err(AppError::Validation)?;

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        let appointment = AppointmentRepository::find_by_id_for_update(&mut tx, id).await?;
        AppointmentRepository::lock_day(&mut tx, appointment.doctor_id, appointment.date).await?;

        let notes = payload
            .notes
            .as_deref()
            .map(|addition| append_note(appointment.notes.as_deref(), addition));
        let updated =
            AppointmentRepository::update_status(&mut tx, id, status, notes.as_deref()).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        events.publish(
            topics::STATUS_UPDATED,
            json!({
                "appointment_id": updated.id,
                "status": updated.status,
                "updated_by": ctx.user_id,
                "updated_at": updated.updated_at,
            }),
        );
        info!(appointment_id = %updated.id, status = %updated.status, "appointment status updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_roles(roles: &[&str]) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn notes_are_appended_not_replaced() {
        assert_eq!(
            append_note(Some("Rescheduled: patient request"), "Confirmed by phone"),
            "Rescheduled: patient request\nConfirmed by phone"
        );
        assert_eq!(append_note(None, "Confirmed by phone"), "Confirmed by phone");
    }

    #[test]
    fn status_update_notes_keep_the_reschedule_trail() {
        // A status update carrying notes must not erase history already on
        // the record.
        let existing = Some("Rescheduled: clinic closure");
        let merged = append_note(existing, "Marked confirmed at front desk");
        assert!(merged.contains("Rescheduled: clinic closure"));
        assert!(merged.ends_with("Marked confirmed at front desk"));
    }

    #[test]
    fn patients_can_only_book_for_themselves() {
        let ctx = context_with_roles(&["PATIENT"]);
        assert!(require_booking_for(&ctx, ctx.user_id).is_ok());
        assert!(matches!(
            require_booking_for(&ctx, Uuid::new_v4()),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn staff_may_book_on_a_patients_behalf() {
        for role in ["ADMIN", "DOCTOR", "admin"] {
            let ctx = context_with_roles(&[role]);
            assert!(require_booking_for(&ctx, Uuid::new_v4()).is_ok());
        }
    }
}
