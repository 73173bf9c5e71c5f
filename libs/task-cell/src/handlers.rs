use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::clock::clinic_today;
use shared_utils::extractor::require_role;
use shared_utils::upload::FileUpload;

use crate::models::{
    CollaboratorsRequest, CreateTaskRequest, NoteRequest, NotificationIntervalRequest,
    ReorderRequest, StatusRequest, TaskError, TaskListQuery, UpdateTaskRequest,
};
use crate::services::TaskService;

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound => AppError::NotFound(err.to_string()),
            TaskError::NotOwner | TaskError::NoAccess | TaskError::InvalidOrder(_) => {
                AppError::Forbidden(err.to_string())
            }
            TaskError::Invalid(errors) => AppError::FormErrors(errors),
            TaskError::InvalidDocument(_) => AppError::BadRequest(err.to_string()),
            TaskError::Storage(msg) => AppError::ExternalService(msg),
            TaskError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

const CARE_ROLES: &[Role] = &[Role::Doctor, Role::Nurse];

/// Role check plus the caller's employee id.
fn care_staff(user: &User, roles: &[Role]) -> Result<Uuid, AppError> {
    require_role(user, roles)?;
    user.employee_id()
}

#[axum::debug_handler]
pub async fn task_board(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let board = TaskService::new(&config)
        .board(caller, &query, clinic_today(&config))
        .await?;

    Ok(Json(json!(board)))
}

#[axum::debug_handler]
pub async fn create_task(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = care_staff(&user, &[Role::Doctor])?;

    let task = TaskService::new(&config).create(caller, request).await?;
    Ok((StatusCode::CREATED, Json(json!(task))))
}

#[axum::debug_handler]
pub async fn get_task(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let detail = TaskService::new(&config).detail(task_id, caller).await?;
    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn update_task(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, &[Role::Doctor])?;

    let task = TaskService::new(&config).update(task_id, caller, request).await?;
    Ok(Json(json!(task)))
}

#[axum::debug_handler]
pub async fn delete_task(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let caller = care_staff(&user, &[Role::Doctor])?;

    TaskService::new(&config).delete(task_id, caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn update_status(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let task = TaskService::new(&config)
        .set_status(task_id, caller, request.status)
        .await?;
    Ok(Json(json!(task)))
}

#[axum::debug_handler]
pub async fn update_notification_interval(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<NotificationIntervalRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let task = TaskService::new(&config)
        .set_notification_interval(task_id, caller, request.notify_interval_hours)
        .await?;
    Ok(Json(json!(task)))
}

#[axum::debug_handler]
pub async fn collaborator_candidates(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let staff = TaskService::new(&config).collaborator_candidates(caller).await?;
    let (doctors, nurses): (Vec<_>, Vec<_>) = staff
        .into_iter()
        .partition(|e| e.role == Role::Doctor);

    Ok(Json(json!({
        "doctors": doctors,
        "nurses": nurses
    })))
}

#[axum::debug_handler]
pub async fn update_collaborators(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<CollaboratorsRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let retained = TaskService::new(&config)
        .set_collaborators(task_id, caller, &request.collaborator_ids)
        .await?;

    Ok(Json(json!({
        "task_id": task_id,
        "collaborator_ids": retained
    })))
}

#[axum::debug_handler]
pub async fn reorder_tasks(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let plan = TaskService::new(&config).reorder(caller, &request.order).await?;
    let order: Vec<Value> = plan
        .iter()
        .map(|(id, position)| json!({ "id": id, "sort_order": position }))
        .collect();

    Ok(Json(json!({
        "status": "ok",
        "order": order
    })))
}

#[axum::debug_handler]
pub async fn upload_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(upload): Json<FileUpload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let document = TaskService::new(&config)
        .upload_document(task_id, caller, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(document))))
}

#[axum::debug_handler]
pub async fn add_note(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(task_id): Path<Uuid>,
    Json(request): Json<NoteRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = care_staff(&user, CARE_ROLES)?;

    let note = TaskService::new(&config)
        .add_note(task_id, caller, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(note))))
}
