use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use time::{Date, Duration, OffsetDateTime};
use tracing::info;

use crate::config::ReminderConfig;
use crate::db::models::Appointment;
use crate::db::repositories::AppointmentRepository;
use crate::error::AppResult;
use crate::events::{topics, EventSink};

const REMINDER_TYPE: &str = "24_hour";

#[derive(Debug, Serialize)]
pub struct ReminderSweepReport {
    pub target_date: Date,
    pub reminders_sent: usize,
}

/// Publishes reminder events for tomorrow's (configurable) appointments.
/// Invoked by an operator or an external scheduler hitting the sweep
/// endpoint; the service never schedules itself.
pub struct ReminderService;

impl ReminderService {
    fn target_date(config: &ReminderConfig) -> Date {
        OffsetDateTime::now_utc()
            .date()
            .saturating_add(Duration::days(config.lookahead_days))
    }

    pub async fn upcoming(pool: &PgPool, config: &ReminderConfig) -> AppResult<Vec<Appointment>> {
        let date = Self::target_date(config);
        let rows = AppointmentRepository::list_blocking_in_window(
            pool,
            date,
            config.window_start,
            config.window_end,
        )
        .await?;
        Ok(rows)
    }

    pub async fn sweep(
        pool: &PgPool,
        events: &EventSink,
        config: &ReminderConfig,
    ) -> AppResult<ReminderSweepReport> {
        let date = Self::target_date(config);
        let due = Self::upcoming(pool, config).await?;

        for appointment in &due {
            events.publish(
                topics::REMINDER,
                json!({
                    "appointment_id": appointment.id,
                    "patient_id": appointment.patient_id,
                    "doctor_id": appointment.doctor_id,
                    "date": appointment.date,
                    "time": appointment.start_time,
                    "reminder_type": REMINDER_TYPE,
                }),
            );
        }

        info!(target_date = %date, count = due.len(), "reminder sweep complete");
        Ok(ReminderSweepReport {
            target_date: date,
            reminders_sent: due.len(),
        })
    }
}
