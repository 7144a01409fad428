use serde_json::json;
use sqlx::types::Uuid;
use sqlx::PgPool;
use time::{Date, Time};
use tracing::info;
use validator::Validate;

use crate::db::models::{AvailabilityUpsert, DayWindow, Weekday, WeeklyAvailability};
use crate::db::repositories::{AppointmentRepository, AvailabilityRepository};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::events::{topics, EventSink};
use crate::scheduling;

/// Weekly schedule management and slot enumeration.
pub struct AvailabilityService;

impl AvailabilityService {
    pub async fn list(pool: &PgPool, doctor_id: Uuid) -> AppResult<Vec<WeeklyAvailability>> {
        let rules = AvailabilityRepository::list_for_doctor(pool, doctor_id).await?;
        Ok(rules)
    }

    pub async fn set_day(
        pool: &PgPool,
        events: &EventSink,
        doctor_id: Uuid,
        payload: AvailabilityUpsert,
    ) -> AppResult<WeeklyAvailability> {
        payload.validate()?;
        let window = payload.window().map_err(AppError::Validation)?;

        let saved =
            AvailabilityRepository::upsert(pool, doctor_id, payload.weekday, &window).await?;

        events.publish(
            topics::AVAILABILITY_UPDATED,
            json!({
                "doctor_id": doctor_id,
                "weekday": saved.weekday,
                "is_available": saved.is_available,
            }),
        );
        info!(%doctor_id, weekday = ?saved.weekday, "availability rule saved");
        Ok(saved)
    }

    /// Replaces the doctor's whole week atomically. Days absent from the
    /// payload end up closed, matching the replace-not-merge contract.
    pub async fn set_week(
        pool: &PgPool,
        events: &EventSink,
        doctor_id: Uuid,
        rules: Vec<AvailabilityUpsert>,
    ) -> AppResult<Vec<WeeklyAvailability>> {
        let mut windows = Vec::with_capacity(rules.len());
        for rule in &rules {
            rule.validate()?;
            let window = rule.window().map_err(AppError::Validation)?;
            if windows.iter().any(|(day, _)| *day == rule.weekday) {
                return Err(AppError::Validation(format!(
                    "duplicate weekday {:?} in weekly schedule",
                    rule.weekday
                )));
            }
            windows.push((rule.weekday, window));
        }

        let mut tx = pool.begin().await.map_err(DatabaseError::from)?;
        AvailabilityRepository::clear_for_doctor(&mut tx, doctor_id).await?;
        let mut saved = Vec::with_capacity(windows.len());
        for (weekday, window) in &windows {
            saved.push(
                AvailabilityRepository::upsert(&mut *tx, doctor_id, *weekday, window).await?,
            );
        }
        tx.commit().await.map_err(DatabaseError::from)?;

        events.publish(
            topics::AVAILABILITY_UPDATED,
            json!({
                "doctor_id": doctor_id,
                "days_replaced": saved.len(),
            }),
        );
        info!(%doctor_id, days = saved.len(), "weekly schedule replaced");
        Ok(saved)
    }

    /// Bookable start times for one doctor on one date.
    pub async fn available_slots(
        pool: &PgPool,
        doctor_id: Uuid,
        date: Date,
        duration_minutes: i32,
    ) -> AppResult<Vec<Time>> {
        if !(15..=480).contains(&duration_minutes) {
            return Err(AppError::Validation(
                "duration must be between 15 and 480 minutes".to_string(),
            ));
        }

        let window = AvailabilityRepository::find_rule(pool, doctor_id, Weekday::of(date))
            .await?
            .map(|rule| rule.window())
            .unwrap_or(DayWindow::Closed);

        let existing = AppointmentRepository::list_for_day(pool, doctor_id, date).await?;
        Ok(scheduling::available_slots(
            &window,
            &existing,
            date,
            duration_minutes,
        ))
    }
}
