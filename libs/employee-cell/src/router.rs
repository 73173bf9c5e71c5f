use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn employee_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route("/stats", get(employee_stats))
        .route("/export", get(export_employees))
        .route("/me/notifications", get(get_my_notifications).put(update_my_notifications))
        .route("/{id}", get(get_employee).put(update_employee).delete(delete_employee))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
