use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::{
    auth,
    handlers::{
        handle_websocket, task_handlers, user_handlers,
    },
    infra::app_state::AppState,
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public liveness endpoint
        .route("/health", get(health_handler))
        // Merge protected routes
        .merge(create_protected_routes(state))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create protected routes that require authentication
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Task endpoints
        //
        .route(
            "/tasks",
            get(task_handlers::list_tasks_handler)
                .post(task_handlers::create_task_handler),
        )
        .route(
            "/tasks/statistics",
            get(task_handlers::get_statistics_handler),
        )
        .route("/tasks/reorder", post(task_handlers::reorder_tasks_handler))
        .route(
            "/tasks/{id}",
            get(task_handlers::get_task_handler)
                .put(task_handlers::update_task_handler)
                .delete(task_handlers::delete_task_handler),
        )
        // User endpoints
        //
        .route("/users/me", get(user_handlers::get_current_user_handler))
        .route(
            "/users/{id}/statistics",
            get(task_handlers::get_user_statistics_handler),
        )
        // Private event channels
        .route(
            "/channels/ws",
            axum::routing::any(handle_websocket::websocket_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::middleware::auth_middleware,
        ))
}
