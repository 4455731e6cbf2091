use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    guard::{Policy, guard_resource, require_member},
    handlers::notify,
    models::{
        CountResponse, CreateForumPostRequest, CreateReplyRequest, ForumPostDetail, ForumPostSummary,
        ForumReplyView, NewNotification, UpdateForumPostRequest,
    },
    repository::Repository,
    validation::{require_bool, required_text},
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 10_000;

async fn load_detail(
    repo: &dyn Repository,
    group_id: Uuid,
    post_id: Uuid,
) -> ApiResult<ForumPostDetail> {
    repo.get_post_detail(group_id, post_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Forum post not found"))
}

/// list_forum_posts
///
/// [Member Route] Posts of a group, newest first, with reply counts.
#[utoipa::path(
    get,
    path = "/groups/{id}/forum",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Forum posts", body = [ForumPostSummary]),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_forum_posts(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<ForumPostSummary>>> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(repo.list_posts(group_id).await?))
}

/// create_forum_post
///
/// [Member Route] Opens a new thread. The author is always the caller.
#[utoipa::path(
    post,
    path = "/groups/{id}/forum",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = CreateForumPostRequest,
    responses(
        (status = 201, description = "Created", body = ForumPostDetail),
        (status = 400, description = "Invalid title or content"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn create_forum_post(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateForumPostRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ForumPostDetail>)> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;

    let Json(req) = body?;
    let title = required_text(&req.title, "title", MAX_TITLE_CHARS)?;
    let content = required_text(&req.content, "content", MAX_CONTENT_CHARS)?;

    let post = repo.create_post(group_id, caller.id, title, content).await?;
    tracing::info!(post_id = %post.id, %group_id, "forum post created");

    Ok((StatusCode::CREATED, Json(load_detail(repo, group_id, post.id).await?)))
}

/// get_forum_post
///
/// [Member Route] A single thread with its author and ordered replies.
#[utoipa::path(
    get,
    path = "/groups/{id}/forum/{postId}",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("postId" = Uuid, Path, description = "Forum post ID")
    ),
    responses(
        (status = 200, description = "Forum post", body = ForumPostDetail),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_forum_post(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<ForumPostDetail>> {
    let Path((group_id, post_id)) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(load_detail(repo, group_id, post_id).await?))
}

/// update_forum_post
///
/// [Member Route] Flips the `isResolved` flag.
///
/// *Authorization*: the post author, or an OWNER/ADMIN of the group. The body
/// must be exactly `{"isResolved": <boolean>}`; anything else is a 400 and the
/// stored value is left untouched.
#[utoipa::path(
    patch,
    path = "/groups/{id}/forum/{postId}",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("postId" = Uuid, Path, description = "Forum post ID")
    ),
    request_body = UpdateForumPostRequest,
    responses(
        (status = 200, description = "Updated", body = ForumPostDetail),
        (status = 400, description = "isResolved must be a boolean"),
        (status = 403, description = "Not a member, or not the author/admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_forum_post(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ForumPostDetail>> {
    let Path((group_id, post_id)) = path?;
    let repo = state.repo.as_ref();

    let guarded = guard_resource(
        repo,
        &caller,
        group_id,
        Policy::AuthorOrElevated,
        "Forum post",
        repo.get_post(group_id, post_id),
    )
    .await?;

    let Json(body) = body?;
    let is_resolved = require_bool(&body, "isResolved")?;

    repo.update_resolution(guarded.resource.id, is_resolved).await?;
    tracing::info!(%post_id, is_resolved, by = %caller.id, "forum post resolution updated");

    Ok(Json(load_detail(repo, group_id, post_id).await?))
}

/// add_forum_reply
///
/// [Member Route] Replies to a thread and notifies the post author (unless the
/// author is replying to themselves).
#[utoipa::path(
    post,
    path = "/groups/{id}/forum/{postId}/replies",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("postId" = Uuid, Path, description = "Forum post ID")
    ),
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply added", body = ForumReplyView),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_forum_reply(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    body: Result<Json<CreateReplyRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ForumReplyView>)> {
    let Path((group_id, post_id)) = path?;
    let repo = state.repo.as_ref();

    let guarded = guard_resource(
        repo,
        &caller,
        group_id,
        Policy::AnyMember,
        "Forum post",
        repo.get_post(group_id, post_id),
    )
    .await?;

    let Json(req) = body?;
    let content = required_text(&req.content, "content", MAX_CONTENT_CHARS)?;

    let reply = repo.add_reply(post_id, caller.id, content).await?;

    let post = guarded.resource;
    if post.author_id != caller.id {
        notify(
            repo,
            NewNotification {
                user_id: post.author_id,
                notification_type: "forum_reply".to_string(),
                title: "New reply".to_string(),
                message: format!("{} replied to \"{}\"", caller.name, post.title),
                link: Some(format!("/groups/{group_id}/forum/{post_id}")),
            },
        )
        .await;
    }

    Ok((StatusCode::CREATED, Json(reply)))
}

/// count_my_forum_posts
#[utoipa::path(
    get,
    path = "/users/forum-posts/count",
    responses((status = 200, description = "Count", body = CountResponse))
)]
pub async fn count_my_forum_posts(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CountResponse>> {
    let count = state.repo.count_posts_by_author(caller.id).await?;
    Ok(Json(CountResponse { count }))
}
