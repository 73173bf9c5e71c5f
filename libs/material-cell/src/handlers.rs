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

use crate::models::{
    AlertQuery, CreateLoanRequest, CreateMaterialRequest, ExtendLoanRequest, LoanQuery,
    LocationRequest, MaterialError, MaterialSearchQuery, StateTransition, SupplierRequest,
    UpdateMaterialRequest,
};
use crate::services::stats::compute_material_stats;
use crate::services::{AlertService, DirectoryService, LoanService, MaterialService};

impl From<MaterialError> for AppError {
    fn from(err: MaterialError) -> Self {
        match err {
            MaterialError::NotFound
            | MaterialError::LoanNotFound
            | MaterialError::AlertNotFound
            | MaterialError::SupplierNotFound
            | MaterialError::LocationNotFound => AppError::NotFound(err.to_string()),
            MaterialError::InvalidTransition { .. }
            | MaterialError::NotAvailable { .. }
            | MaterialError::AlreadyReturned
            | MaterialError::InvalidDueDate { .. }
            | MaterialError::QuantityOverflow => AppError::BadRequest(err.to_string()),
            MaterialError::Invalid(errors) => AppError::FormErrors(errors),
            MaterialError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

const MATERIAL_ROLES: &[Role] = &[Role::MaterialManager, Role::Admin];

// ==============================================================================
// MATERIALS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_materials(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<MaterialSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let today = clinic_today(&config);
    let materials = MaterialService::new(&config).list(&query).await?;

    let rows: Vec<Value> = materials
        .iter()
        .map(|m| {
            let mut row = json!(m);
            row["is_expired"] = json!(m.is_expired(today));
            row["expires_soon"] = json!(m.expires_soon(today));
            row
        })
        .collect();

    Ok(Json(json!({
        "materials": rows,
        "total": rows.len()
    })))
}

#[axum::debug_handler]
pub async fn create_material(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let material = MaterialService::new(&config).create(request).await?;
    Ok((StatusCode::CREATED, Json(json!(material))))
}

#[axum::debug_handler]
pub async fn get_material(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let detail = MaterialService::new(&config).get_detail(material_id).await?;
    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn update_material(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
    Json(request): Json<UpdateMaterialRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let material = MaterialService::new(&config).update(material_id, request).await?;
    Ok(Json(json!(material)))
}

#[axum::debug_handler]
pub async fn delete_material(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    MaterialService::new(&config).delete(material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition(
    config: &AppConfig,
    user: &User,
    material_id: Uuid,
    transition: StateTransition,
) -> Result<Json<Value>, AppError> {
    require_role(user, MATERIAL_ROLES)?;

    let material = MaterialService::new(config).apply_transition(material_id, transition).await?;
    Ok(Json(json!(material)))
}

pub async fn put_in_maintenance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&config, &user, material_id, StateTransition::Maintenance).await
}

pub async fn back_in_service(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&config, &user, material_id, StateTransition::BackInService).await
}

pub async fn repair_material(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    transition(&config, &user, material_id, StateTransition::Repair).await
}

#[axum::debug_handler]
pub async fn material_history(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(material_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let service = MaterialService::new(&config);
    service.get(material_id).await?;
    let history = service.history(material_id).await?;

    Ok(Json(json!({ "history": history })))
}

/// Refreshes alerts, then reports inventory figures.
#[axum::debug_handler]
pub async fn material_dashboard(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let today = clinic_today(&config);
    let alert_service = AlertService::new(&config);
    let sweep = alert_service.sweep(today).await?;

    let materials = MaterialService::new(&config);
    let loans = LoanService::new(&config);
    let unresolved = AlertQuery { resolved: Some(false), ..Default::default() };
    let (all_materials, all_loans, alerts) = futures::try_join!(
        materials.list_all(),
        loans.list_all(),
        alert_service.list(&unresolved),
    )?;

    let stats = compute_material_stats(&all_materials, &all_loans, &alerts, today);
    let recent_alerts: Vec<_> = alerts.into_iter().take(5).collect();

    Ok(Json(json!({
        "stats": stats,
        "sweep": sweep,
        "recent_alerts": recent_alerts
    })))
}

// ==============================================================================
// ALERTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_alerts(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let alerts = AlertService::new(&config).list(&query).await?;
    Ok(Json(json!({
        "alerts": alerts,
        "total": alerts.len()
    })))
}

#[axum::debug_handler]
pub async fn sweep_alerts(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let summary = AlertService::new(&config).sweep(clinic_today(&config)).await?;
    Ok(Json(json!(summary)))
}

#[axum::debug_handler]
pub async fn resolve_alert(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let alert = AlertService::new(&config).resolve(alert_id).await?;
    Ok(Json(json!(alert)))
}

#[axum::debug_handler]
pub async fn delete_alert(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(alert_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    AlertService::new(&config).delete(alert_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn export_alerts(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<AlertQuery>,
) -> Result<Response, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let alerts = AlertService::new(&config).list(&query).await?;
    let rows = alerts
        .iter()
        .map(|a| {
            vec![
                a.created_at.format("%Y-%m-%d %H:%M").to_string(),
                a.alert_type.label().to_string(),
                a.priority.label().to_string(),
                a.message.clone(),
                if a.resolved { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();

    csv_attachment("alerts", &["Created", "Type", "Priority", "Message", "Resolved"], rows)
}

// ==============================================================================
// LOANS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_loans(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<LoanQuery>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loans = LoanService::new(&config).list(&query, clinic_today(&config)).await?;
    Ok(Json(json!({
        "loans": loans,
        "total": loans.len()
    })))
}

#[axum::debug_handler]
pub async fn create_loan(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loan = LoanService::new(&config).create(request, clinic_today(&config)).await?;
    Ok((StatusCode::CREATED, Json(json!(loan))))
}

#[axum::debug_handler]
pub async fn get_loan(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loan = LoanService::new(&config).get(loan_id, clinic_today(&config)).await?;
    Ok(Json(json!(loan)))
}

#[axum::debug_handler]
pub async fn return_loan(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loan = LoanService::new(&config).return_loan(loan_id, clinic_today(&config)).await?;
    Ok(Json(json!(loan)))
}

#[axum::debug_handler]
pub async fn extend_loan(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<ExtendLoanRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loan = LoanService::new(&config)
        .extend(loan_id, request.due_date, clinic_today(&config))
        .await?;
    Ok(Json(json!(loan)))
}

#[axum::debug_handler]
pub async fn export_loans(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<LoanQuery>,
) -> Result<Response, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let loans = LoanService::new(&config).list(&query, clinic_today(&config)).await?;
    let rows = loans
        .iter()
        .map(|view| {
            vec![
                view.material_name.clone().unwrap_or_default(),
                view.loan.borrower.clone(),
                view.loan.service.clone(),
                view.loan.loan_date.format("%Y-%m-%d").to_string(),
                view.loan.due_date.format("%Y-%m-%d").to_string(),
                view.loan.returned_on.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                view.loan.status.label().to_string(),
                view.days_overdue.to_string(),
            ]
        })
        .collect();

    csv_attachment(
        "loans",
        &["Material", "Borrower", "Service", "Loan date", "Due date", "Returned on", "Status", "Days overdue"],
        rows,
    )
}

// ==============================================================================
// SUPPLIERS AND LOCATIONS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_suppliers(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let suppliers = DirectoryService::new(&config).list_suppliers().await?;
    Ok(Json(json!({ "suppliers": suppliers })))
}

#[axum::debug_handler]
pub async fn create_supplier(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<SupplierRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let supplier = DirectoryService::new(&config).create_supplier(request).await?;
    Ok((StatusCode::CREATED, Json(json!(supplier))))
}

#[axum::debug_handler]
pub async fn update_supplier(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(supplier_id): Path<Uuid>,
    Json(request): Json<SupplierRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let supplier = DirectoryService::new(&config).update_supplier(supplier_id, request).await?;
    Ok(Json(json!(supplier)))
}

#[axum::debug_handler]
pub async fn delete_supplier(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(supplier_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    DirectoryService::new(&config).delete_supplier(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_locations(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let locations = DirectoryService::new(&config).list_locations().await?;
    let rows: Vec<Value> = locations
        .iter()
        .map(|l| {
            let mut row = json!(l);
            row["label"] = json!(l.label());
            row
        })
        .collect();

    Ok(Json(json!({ "locations": rows })))
}

#[axum::debug_handler]
pub async fn create_location(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<LocationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let location = DirectoryService::new(&config).create_location(request).await?;
    Ok((StatusCode::CREATED, Json(json!(location))))
}

#[axum::debug_handler]
pub async fn update_location(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(location_id): Path<Uuid>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    let location = DirectoryService::new(&config).update_location(location_id, request).await?;
    Ok(Json(json!(location)))
}

#[axum::debug_handler]
pub async fn delete_location(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(location_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_role(&user, MATERIAL_ROLES)?;

    DirectoryService::new(&config).delete_location(location_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
