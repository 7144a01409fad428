use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use sqlx::types::Uuid;
use time::{Date, Time};

use crate::app_state::AppState;
use crate::db::models::{AvailabilityUpsert, WeeklyAvailability};
use crate::error::{AppError, AppResult};
use crate::identity::AuthContext;
use crate::services::availability::AvailabilityService;

const SCHEDULE_ROLES: &[&str] = &["ADMIN", "DOCTOR"];

fn require_scheduler(ctx: &AuthContext) -> AppResult<()> {
    if ctx.has_any_role(SCHEDULE_ROLES) {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "requires ADMIN or DOCTOR role".to_string(),
        ))
    }
}

pub async fn list_availability(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
) -> AppResult<Json<Vec<WeeklyAvailability>>> {
    let rules = AvailabilityService::list(&state.db, doctor_id).await?;
    Ok(Json(rules))
}

pub async fn set_day_availability(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(doctor_id): Path<Uuid>,
    Json(payload): Json<AvailabilityUpsert>,
) -> AppResult<Json<WeeklyAvailability>> {
    require_scheduler(&ctx)?;
    let saved = AvailabilityService::set_day(&state.db, &state.events, doctor_id, payload).await?;
    Ok(Json(saved))
}

pub async fn set_weekly_schedule(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(doctor_id): Path<Uuid>,
    Json(payload): Json<Vec<AvailabilityUpsert>>,
) -> AppResult<Json<Vec<WeeklyAvailability>>> {
    require_scheduler(&ctx)?;
    let saved = AvailabilityService::set_week(&state.db, &state.events, doctor_id, payload).await?;
    Ok(Json(saved))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: Date,
    pub duration_minutes: Option<i32>,
}

pub async fn available_slots(
    State(state): State<AppState>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<Vec<Time>>> {
    let duration = query.duration_minutes.unwrap_or(30);
    let slots =
        AvailabilityService::available_slots(&state.db, doctor_id, query.date, duration).await?;
    Ok(Json(slots))
}
