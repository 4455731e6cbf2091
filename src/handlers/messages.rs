use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    guard::require_member,
    models::{CountResponse, CreateMessageRequest, MessageView},
    validation::{clamp_limit, required_text},
};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;
const MAX_CONTENT_CHARS: usize = 4_000;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessageQuery {
    /// Number of recent messages to return (1 to 200, default 50).
    pub limit: Option<i64>,
}

/// list_messages
///
/// [Member Route] The latest messages of a group chat, oldest first so the
/// client can append them in order.
#[utoipa::path(
    get,
    path = "/groups/{id}/messages",
    params(("id" = Uuid, Path, description = "Group ID"), MessageQuery),
    responses(
        (status = 200, description = "Messages", body = [MessageView]),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_messages(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<MessageView>>> {
    let Path(group_id) = path?;
    let Query(query) = query?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;

    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
    Ok(Json(repo.list_messages(group_id, limit).await?))
}

/// send_message
#[utoipa::path(
    post,
    path = "/groups/{id}/messages",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Sent", body = MessageView),
        (status = 400, description = "Empty or too long"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn send_message(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;

    let Json(req) = body?;
    let content = required_text(&req.content, "content", MAX_CONTENT_CHARS)?;

    let message = repo.create_message(group_id, caller.id, content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// count_my_messages
#[utoipa::path(
    get,
    path = "/users/messages/count",
    responses((status = 200, description = "Count", body = CountResponse))
)]
pub async fn count_my_messages(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CountResponse>> {
    let count = state.repo.count_messages_by_sender(caller.id).await?;
    Ok(Json(CountResponse { count }))
}
