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
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::clock::clinic_today;
use shared_utils::export::csv_attachment;
use shared_utils::extractor::require_role;

use crate::models::{
    CreateEmployeeRequest, EmployeeError, EmployeeSearchQuery, NotificationPreferencesRequest,
    Role, UpdateEmployeeRequest,
};
use crate::services::EmployeeService;

impl From<EmployeeError> for AppError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::NotFound => AppError::NotFound(err.to_string()),
            EmployeeError::LoginTaken { .. } | EmployeeError::EmailTaken { .. } => {
                AppError::Conflict(err.to_string())
            }
            EmployeeError::Invalid(errors) => AppError::FormErrors(errors),
            EmployeeError::MissingPassword => AppError::ValidationError(err.to_string()),
            EmployeeError::InvalidPhoto(_) => AppError::BadRequest(err.to_string()),
            EmployeeError::Storage(msg) => AppError::ExternalService(msg),
            EmployeeError::NotificationsUnavailable => AppError::Forbidden(err.to_string()),
            EmployeeError::PasswordHash(msg) => AppError::Internal(msg),
            EmployeeError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn list_employees(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<EmployeeSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let employees = service.search(&query).await?;

    Ok(Json(json!({
        "employees": employees,
        "total": employees.len()
    })))
}

#[axum::debug_handler]
pub async fn create_employee(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let employee = service.create(request).await?;

    Ok((StatusCode::CREATED, Json(json!(employee))))
}

#[axum::debug_handler]
pub async fn get_employee(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let employee = service.get(employee_id).await?;

    Ok(Json(json!(employee)))
}

#[axum::debug_handler]
pub async fn update_employee(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(employee_id): Path<Uuid>,
    Json(request): Json<UpdateEmployeeRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let employee = service.update(employee_id, request).await?;

    Ok(Json(json!(employee)))
}

#[axum::debug_handler]
pub async fn delete_employee(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(employee_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    service.delete(employee_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn employee_stats(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let stats = service.get_stats(clinic_today(&config)).await?;

    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn export_employees(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<EmployeeSearchQuery>,
) -> Result<Response, AppError> {
    require_role(&user, &[Role::Admin])?;

    let service = EmployeeService::new(&config);
    let employees = service.search(&query).await?;

    let rows = employees
        .iter()
        .map(|e| {
            vec![
                e.last_name.clone(),
                e.first_name.clone(),
                e.role.label().to_string(),
                e.login.clone(),
                e.email.clone(),
                e.phone.clone().unwrap_or_default(),
                e.hire_date.format("%Y-%m-%d").to_string(),
                e.service.clone(),
                e.state.label().to_string(),
            ]
        })
        .collect();

    csv_attachment(
        "employees",
        &["Last name", "First name", "Role", "Login", "Email", "Phone", "Hire date", "Service", "State"],
        rows,
    )
}

#[axum::debug_handler]
pub async fn get_my_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Nurse])?;

    let service = EmployeeService::new(&config);
    let employee = service.get(user.employee_id()?).await?;

    Ok(Json(json!({
        "notification_enabled": employee.notification_enabled,
        "notification_interval_hours": employee.notification_interval_hours
    })))
}

#[axum::debug_handler]
pub async fn update_my_notifications(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<NotificationPreferencesRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &[Role::Doctor, Role::Nurse])?;

    let service = EmployeeService::new(&config);
    let employee = service
        .update_notification_preferences(user.employee_id()?, request)
        .await?;

    Ok(Json(json!({
        "notification_enabled": employee.notification_enabled,
        "notification_interval_hours": employee.notification_interval_hours
    })))
}
