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
use shared_utils::clock::clinic_today;
use shared_utils::export::csv_attachment;
use shared_utils::extractor::require_role;
use shared_utils::upload::FileUpload;

use crate::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::Invalid(errors) => AppError::FormErrors(errors),
            PatientError::InvalidRecord(_) => AppError::BadRequest(err.to_string()),
            PatientError::Storage(msg) => AppError::ExternalService(msg),
            PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

const PATIENT_ROLES: &[Role] = &[Role::Doctor, Role::Nurse, Role::Admin];

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patient = PatientService::new(&config)
        .create_patient(request, clinic_today(&config))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patient = PatientService::new(&config).get_patient(patient_id).await?;

    let mut body = json!(patient);
    body["age"] = json!(patient.age(clinic_today(&config)));
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patient = PatientService::new(&config)
        .update_patient(patient_id, request, clinic_today(&config))
        .await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn upload_record(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(upload): Json<FileUpload>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patient = PatientService::new(&config).attach_record(patient_id, upload).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    PatientService::new(&config).delete_patient(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patients = PatientService::new(&config).search_patients(&query).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn export_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Response, AppError> {
    require_role(&user, PATIENT_ROLES)?;

    let patients = PatientService::new(&config).search_patients(&query).await?;
    let rows = patients
        .iter()
        .map(|p| {
            vec![
                p.last_name.clone(),
                p.first_name.clone(),
                p.birth_date.format("%Y-%m-%d").to_string(),
                p.sex.to_string(),
                p.record_url.clone().unwrap_or_default(),
            ]
        })
        .collect();

    csv_attachment("patients", &["Last name", "First name", "Birth date", "Sex", "Record"], rows)
}
