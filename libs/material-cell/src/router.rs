use std::sync::Arc;

use axum::{middleware, routing::{get, post, put}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn material_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route("/dashboard", get(material_dashboard))
        // Alerts
        .route("/alerts", get(list_alerts))
        .route("/alerts/sweep", post(sweep_alerts))
        .route("/alerts/export", get(export_alerts))
        .route("/alerts/{id}", axum::routing::delete(delete_alert))
        .route("/alerts/{id}/resolve", post(resolve_alert))
        // Loans
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/export", get(export_loans))
        .route("/loans/{id}", get(get_loan))
        .route("/loans/{id}/return", post(return_loan))
        .route("/loans/{id}/extend", post(extend_loan))
        // Suppliers and locations
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/{id}", put(update_supplier).delete(delete_supplier))
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/{id}", put(update_location).delete(delete_location))
        // Single material
        .route("/{id}", get(get_material).put(update_material).delete(delete_material))
        .route("/{id}/history", get(material_history))
        .route("/{id}/maintenance", post(put_in_maintenance))
        .route("/{id}/back-in-service", post(back_in_service))
        .route("/{id}/repair", post(repair_material))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
