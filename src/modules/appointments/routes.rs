use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    appointment_statistics, cancel_appointment, create_appointment, doctor_appointments,
    get_appointment, list_appointments, patient_appointments, reschedule_appointment,
    sweep_reminders, upcoming_reminders, update_appointment_status,
};

pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_appointment).get(list_appointments))
        .route("/statistics", get(appointment_statistics))
        .route("/reminders/sweep", post(sweep_reminders))
        .route("/reminders/upcoming", get(upcoming_reminders))
        .route("/doctor/{doctor_id}", get(doctor_appointments))
        .route("/patient/{patient_id}", get(patient_appointments))
        .route("/{id}", get(get_appointment))
        .route("/{id}/cancel", put(cancel_appointment))
        .route("/{id}/reschedule", put(reschedule_appointment))
        .route("/{id}/status", put(update_appointment_status))
}
