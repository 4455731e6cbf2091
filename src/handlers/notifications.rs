use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{MarkNotificationsRequest, MarkNotificationsResponse, Notification},
    validation::{clamp_limit, require_bool, require_uuid_array},
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct NotificationQuery {
    /// 1 to 100, default 20.
    pub limit: Option<i64>,
    /// Only return unread notifications.
    #[serde(default)]
    pub unread_only: bool,
}

/// list_notifications
///
/// [Authenticated Route] The caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notifications", body = [Notification]),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_notifications(
    caller: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<NotificationQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Notification>>> {
    let Query(query) = query?;
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);

    let notifications = state
        .repo
        .list_notifications(caller.id, query.unread_only, limit)
        .await?;
    Ok(Json(notifications))
}

/// mark_notifications
///
/// [Authenticated Route] Bulk read/unread toggle.
///
/// Ids that belong to other users are silently skipped: the update is scoped
/// to the caller's rows, and `updatedCount` reports how many actually changed.
#[utoipa::path(
    patch,
    path = "/notifications",
    request_body = MarkNotificationsRequest,
    responses(
        (status = 200, description = "Updated", body = MarkNotificationsResponse),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn mark_notifications(
    caller: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MarkNotificationsResponse>> {
    let Json(body) = body?;
    let ids = require_uuid_array(&body, "notificationIds")?;
    let mark_as_read = require_bool(&body, "markAsRead")?;

    let updated_count = state
        .repo
        .set_read_state(caller.id, &ids, mark_as_read)
        .await?;
    tracing::debug!(user_id = %caller.id, requested = ids.len(), updated_count, "notifications marked");

    Ok(Json(MarkNotificationsResponse { updated_count }))
}
