use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult, ErrorBody},
    models::User,
};

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    )
)]
pub async fn get_me(caller: AuthUser, State(state): State<AppState>) -> ApiResult<Json<User>> {
    state
        .repo
        .get_user(caller.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// health_check
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_check() -> &'static str {
    "ok"
}

/// socket_placeholder
///
/// [Public Route] Reserved for the real-time chat transport, which runs as a
/// separate service. Always 501.
#[utoipa::path(
    get,
    path = "/socket",
    responses((status = 501, description = "Not implemented", body = ErrorBody))
)]
pub async fn socket_placeholder() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(ErrorBody {
            error: "Real-time transport is served separately".to_string(),
        }),
    )
}
