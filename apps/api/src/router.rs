use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use employee_cell::router::employee_routes;
use material_cell::router::material_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use task_cell::router::task_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic back-office API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/employees", employee_routes(state.clone()))
        .nest("/materials", material_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/tasks", task_routes(state))
}
