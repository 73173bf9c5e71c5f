use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_upcoming).post(create_appointment))
        .route("/history", get(list_history))
        .route("/export", get(export_appointments))
        .route("/conflicts/check", get(check_conflicts))
        .route("/doctors/{doctor_id}/history", get(doctor_history))
        .route("/{id}", get(get_appointment).put(update_appointment))
        .route("/{id}/cancel", post(cancel_appointment))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
