use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::clock::clinic_now;
use shared_utils::export::csv_attachment;
use shared_utils::extractor::require_role;

use crate::models::{
    AppointmentError, AppointmentQuery, ConflictCheckQuery, CreateAppointmentRequest,
    UpdateAppointmentRequest,
};
use crate::services::AppointmentService;

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::Conflicts(messages) | AppointmentError::Invalid(messages) => {
                AppError::FormErrors(messages)
            }
            AppointmentError::CannotCancel(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

const APPOINTMENT_ROLES: &[Role] = &[Role::Doctor, Role::Nurse, Role::Admin];

#[axum::debug_handler]
pub async fn list_upcoming(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointments = AppointmentService::new(&config).upcoming(&query).await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn list_history(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointments = AppointmentService::new(&config).history().await?;

    Ok(Json(json!({
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn doctor_history(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointments = AppointmentService::new(&config).doctor_history(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointment = AppointmentService::new(&config)
        .create(request, clinic_now(&config))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointment = AppointmentService::new(&config).get(appointment_id).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointment = AppointmentService::new(&config)
        .update(appointment_id, request, clinic_now(&config))
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointment = AppointmentService::new(&config).cancel(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment cancelled",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let report = AppointmentService::new(&config).check_conflicts(&query).await?;
    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn export_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Response, AppError> {
    require_role(&user, APPOINTMENT_ROLES)?;

    let appointments = AppointmentService::new(&config).upcoming(&query).await?;
    let rows = appointments
        .iter()
        .map(|a| {
            vec![
                a.appointment_date.format("%Y-%m-%d").to_string(),
                a.appointment_time.format("%H:%M").to_string(),
                a.patient_id.to_string(),
                a.doctor_id.to_string(),
                a.status.to_string(),
            ]
        })
        .collect();

    csv_attachment("appointments", &["Date", "Time", "Patient", "Doctor", "Status"], rows)
}
