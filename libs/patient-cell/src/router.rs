use std::sync::Arc;

use axum::{middleware, routing::{get, put}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(search_patients).post(create_patient))
        .route("/export", get(export_patients))
        .route("/{id}", get(get_patient).put(update_patient).delete(delete_patient))
        .route("/{id}/record", put(upload_record))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
