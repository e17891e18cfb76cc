use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use trellis_core::auth::authenticate;

use crate::errors::AppError;
use crate::infra::app_state::AppState;

/// Resolve the bearer token to a user and stash it in request extensions.
///
/// Tokens are opaque secrets issued by the external credential service;
/// this middleware only fingerprints the presented value and looks the
/// session up. Handlers behind it can rely on `Extension<User>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let user = authenticate(state.users.as_ref(), &token)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| {
            AppError::unauthorized("invalid or expired session token")
        })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<String, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;

    Ok(token.to_string())
}
