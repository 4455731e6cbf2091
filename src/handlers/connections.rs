use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    handlers::notify,
    models::{
        Connection, ConnectionStatus, ConnectionView, CreateConnectionRequest, NewNotification,
        RespondConnectionRequest,
    },
};

/// list_connections
///
/// [Authenticated Route] Every connection the caller sent or received, in any status.
#[utoipa::path(
    get,
    path = "/users/connections",
    responses(
        (status = 200, description = "Connections", body = [ConnectionView]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_connections(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConnectionView>>> {
    Ok(Json(state.repo.list_connections(caller.id).await?))
}

/// request_connection
///
/// [Authenticated Route] Sends a connection request and notifies the receiver.
/// Only one pending request may exist per pair of users, whichever side sent it.
#[utoipa::path(
    post,
    path = "/users/connections",
    request_body = CreateConnectionRequest,
    responses(
        (status = 201, description = "Request sent", body = Connection),
        (status = 400, description = "Self request or duplicate pending request"),
        (status = 404, description = "User not found")
    )
)]
pub async fn request_connection(
    caller: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<CreateConnectionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Connection>)> {
    let Json(req) = body?;
    if req.receiver_id == caller.id {
        return Err(ApiError::bad_request("You cannot connect with yourself"));
    }

    let repo = state.repo.as_ref();
    if repo.get_user(req.receiver_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let connection = repo.create_connection(caller.id, req.receiver_id).await?;
    tracing::info!(connection_id = %connection.id, from = %caller.id, to = %req.receiver_id, "connection requested");

    notify(
        repo,
        NewNotification {
            user_id: req.receiver_id,
            notification_type: "connection_request".to_string(),
            title: "New connection request".to_string(),
            message: format!("{} wants to connect with you", caller.name),
            link: Some("/connections".to_string()),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(connection)))
}

/// respond_to_connection
///
/// [Authenticated Route] The receiver accepts or declines a pending request
/// sent by `userId`. Accepting notifies the sender.
#[utoipa::path(
    patch,
    path = "/users/connections/{userId}",
    params(("userId" = Uuid, Path, description = "The user who sent the request")),
    request_body = RespondConnectionRequest,
    responses(
        (status = 200, description = "Updated", body = Connection),
        (status = 400, description = "Status must be accepted or declined"),
        (status = 404, description = "No pending request from this user")
    )
)]
pub async fn respond_to_connection(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<RespondConnectionRequest>, JsonRejection>,
) -> ApiResult<Json<Connection>> {
    let Path(sender_id) = path?;
    let Json(req) = body?;
    if req.status == ConnectionStatus::Pending {
        return Err(ApiError::bad_request(
            "status must be \"accepted\" or \"declined\"",
        ));
    }

    let repo = state.repo.as_ref();
    let connection = repo
        .respond_to_connection(sender_id, caller.id, req.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Connection request not found"))?;
    tracing::info!(connection_id = %connection.id, status = ?connection.status, "connection answered");

    if connection.status == ConnectionStatus::Accepted {
        notify(
            repo,
            NewNotification {
                user_id: sender_id,
                notification_type: "connection_accepted".to_string(),
                title: "Connection accepted".to_string(),
                message: format!("{} accepted your connection request", caller.name),
                link: Some("/connections".to_string()),
            },
        )
        .await;
    }

    Ok(Json(connection))
}

/// cancel_connection
///
/// [Authenticated Route] Withdraws (or dismisses) the pending request between
/// the caller and `userId`, in either direction.
///
/// Accepted and declined connections are never touched; when no pending row
/// exists for the pair the response is 404 and nothing is deleted.
#[utoipa::path(
    delete,
    path = "/users/connections/{userId}",
    params(("userId" = Uuid, Path, description = "The other user of the pair")),
    responses(
        (status = 204, description = "Pending request removed"),
        (status = 404, description = "No pending request for this pair")
    )
)]
pub async fn cancel_connection(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(other_id) = path?;

    if !state
        .repo
        .delete_pending_connection(caller.id, other_id)
        .await?
    {
        return Err(ApiError::not_found("Connection request not found"));
    }

    tracing::info!(user_id = %caller.id, %other_id, "pending connection removed");
    Ok(StatusCode::NO_CONTENT)
}
