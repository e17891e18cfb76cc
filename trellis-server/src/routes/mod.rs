pub mod v1;

use axum::Router;

use crate::infra::app_state::AppState;

/// Assemble the full application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", v1::create_v1_router(state.clone()))
        .with_state(state)
}
