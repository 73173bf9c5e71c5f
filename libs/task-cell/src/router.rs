use std::sync::Arc;

use axum::{middleware, routing::{get, post, put}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn task_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(task_board).post(create_task))
        .route("/reorder", post(reorder_tasks))
        .route("/collaborators/candidates", get(collaborator_candidates))
        .route("/{id}", get(get_task).put(update_task).delete(delete_task))
        .route("/{id}/status", post(update_status))
        .route("/{id}/notification", put(update_notification_interval))
        .route("/{id}/collaborators", put(update_collaborators))
        .route("/{id}/documents", post(upload_document))
        .route("/{id}/notes", post(add_note))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
