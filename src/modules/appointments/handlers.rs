use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::Date;

use crate::app_state::AppState;
use crate::db::models::{
    Appointment, CancelAppointment, NewAppointment, RescheduleAppointment,
    UpdateAppointmentStatus,
};
use crate::db::repositories::{AppointmentFilter, AppointmentRepository};
use crate::error::{AppError, AppResult};
use crate::identity::AuthContext;
use crate::services::booking::BookingService;
use crate::services::reminders::{ReminderService, ReminderSweepReport};
use crate::services::statistics::{AppointmentStatistics, StatisticsService};

const STAFF_ROLES: &[&str] = &["ADMIN", "DOCTOR"];

fn require_staff(ctx: &AuthContext) -> AppResult<()> {
    if ctx.has_any_role(STAFF_ROLES) {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "requires ADMIN or DOCTOR role".to_string(),
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// 1-based page, clamped page size.
    fn bounds(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        (page, per_page, (page - 1) * per_page)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn create_appointment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<NewAppointment>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let created = BookingService::create(&state.db, &state.events, &ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<Appointment>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(AppError::Validation)?;
    let filter = AppointmentFilter {
        doctor_id: query.doctor_id,
        patient_id: query.patient_id,
        status,
        from_date: query.from_date,
        to_date: query.to_date,
    };
    let (page, per_page, offset) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .bounds();
    let (items, total) =
        AppointmentRepository::search(&state.db, &filter, per_page, offset).await?;
    Ok(Json(Paginated {
        items,
        total,
        page,
        per_page,
    }))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Appointment>> {
    let appointment = AppointmentRepository::find_by_id(&state.db, id).await?;
    Ok(Json(appointment))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelAppointment>,
) -> AppResult<Json<Appointment>> {
    let cancelled = BookingService::cancel(&state.db, &state.events, &ctx, id, payload).await?;
    Ok(Json(cancelled))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleAppointment>,
) -> AppResult<Json<Appointment>> {
    let rescheduled =
        BookingService::reschedule(&state.db, &state.events, &ctx, id, payload).await?;
    Ok(Json(rescheduled))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentStatus>,
) -> AppResult<Json<Appointment>> {
    require_staff(&ctx)?;
    let updated =
        BookingService::update_status(&state.db, &state.events, &ctx, id, payload).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct DoctorDayQuery {
    pub date: Option<Date>,
}

pub async fn doctor_appointments(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorDayQuery>,
) -> AppResult<Json<Vec<Appointment>>> {
    let rows = AppointmentRepository::list_for_doctor(&state.db, doctor_id, query.date).await?;
    Ok(Json(rows))
}

pub async fn patient_appointments(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Paginated<Appointment>>> {
    let (page_no, per_page, offset) = page.bounds();
    let items =
        AppointmentRepository::list_for_patient(&state.db, patient_id, per_page, offset).await?;
    let total = AppointmentRepository::count_for_patient(&state.db, patient_id).await?;
    Ok(Json(Paginated {
        items,
        total,
        page: page_no,
        per_page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
    pub doctor_id: Option<Uuid>,
}

pub async fn appointment_statistics(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<StatisticsQuery>,
) -> AppResult<Json<AppointmentStatistics>> {
    require_staff(&ctx)?;
    let stats =
        StatisticsService::summarize(&state.db, query.from_date, query.to_date, query.doctor_id)
            .await?;
    Ok(Json(stats))
}

pub async fn sweep_reminders(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> AppResult<Json<ReminderSweepReport>> {
    require_staff(&ctx)?;
    let report =
        ReminderService::sweep(&state.db, &state.events, &state.env.reminders).await?;
    Ok(Json(report))
}

pub async fn upcoming_reminders(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> AppResult<Json<Vec<Appointment>>> {
    require_staff(&ctx)?;
    let rows = ReminderService::upcoming(&state.db, &state.env.reminders).await?;
    Ok(Json(rows))
}
