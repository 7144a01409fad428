use axum::{
    routing::{get, put},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    available_slots, list_availability, set_day_availability, set_weekly_schedule,
};

pub fn availability_routes() -> Router<AppState> {
    Router::new()
        .route("/{doctor_id}", get(list_availability))
        .route("/{doctor_id}/day", put(set_day_availability))
        .route("/{doctor_id}/weekly", put(set_weekly_schedule))
        .route("/{doctor_id}/slots", get(available_slots))
}
