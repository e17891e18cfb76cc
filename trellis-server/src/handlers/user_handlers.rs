use axum::{Extension, Json};
use trellis_core::api_types::ApiResponse;
use trellis_model::User;

use crate::errors::AppResult;

/// The authenticated actor, as resolved by the auth middleware.
pub async fn get_current_user_handler(
    Extension(user): Extension<User>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(ApiResponse::success(user)))
}
