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
    models::{CreatePollRequest, PollDetail, UpdatePollRequest, VoteRequest},
    repository::Repository,
    validation::{require_bool, required_text},
};

const MAX_QUESTION_CHARS: usize = 300;
const MAX_OPTION_CHARS: usize = 200;
const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;

async fn load_detail(
    repo: &dyn Repository,
    group_id: Uuid,
    poll_id: Uuid,
    viewer_id: Uuid,
) -> ApiResult<PollDetail> {
    repo.get_poll_detail(group_id, poll_id, viewer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Poll not found"))
}

/// list_polls
///
/// [Member Route] Polls of a group, newest first, with tallies.
#[utoipa::path(
    get,
    path = "/groups/{id}/polls",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Polls", body = [PollDetail]),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_polls(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<PollDetail>>> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(repo.list_polls(group_id, caller.id).await?))
}

/// create_poll
///
/// [Member Route] Creates a poll with 2 to 10 options, kept in the order given.
#[utoipa::path(
    post,
    path = "/groups/{id}/polls",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Created", body = PollDetail),
        (status = 400, description = "Invalid question or options"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn create_poll(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreatePollRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PollDetail>)> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;

    let Json(req) = body?;
    let question = required_text(&req.question, "question", MAX_QUESTION_CHARS)?;
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&req.options.len()) {
        return Err(ApiError::bad_request(format!(
            "A poll needs between {MIN_OPTIONS} and {MAX_OPTIONS} options"
        )));
    }
    let options = req
        .options
        .iter()
        .map(|text| required_text(text, "option", MAX_OPTION_CHARS))
        .collect::<Result<Vec<_>, _>>()?;

    let poll = repo
        .create_poll(group_id, caller.id, question, options)
        .await?;
    tracing::info!(poll_id = %poll.id, %group_id, "poll created");

    Ok((
        StatusCode::CREATED,
        Json(load_detail(repo, group_id, poll.id, caller.id).await?),
    ))
}

/// get_poll
#[utoipa::path(
    get,
    path = "/groups/{id}/polls/{pollId}",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("pollId" = Uuid, Path, description = "Poll ID")
    ),
    responses(
        (status = 200, description = "Poll", body = PollDetail),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_poll(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<PollDetail>> {
    let Path((group_id, poll_id)) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(load_detail(repo, group_id, poll_id, caller.id).await?))
}

/// update_poll
///
/// [Member Route] Opens or closes a poll via `{"isClosed": <boolean>}`.
///
/// *Authorization*: the poll creator, or an OWNER/ADMIN of the group. A plain
/// MEMBER who did not create the poll gets 403 and the poll is unchanged.
#[utoipa::path(
    patch,
    path = "/groups/{id}/polls/{pollId}",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("pollId" = Uuid, Path, description = "Poll ID")
    ),
    request_body = UpdatePollRequest,
    responses(
        (status = 200, description = "Updated", body = PollDetail),
        (status = 400, description = "isClosed must be a boolean"),
        (status = 403, description = "Not a member, or not the creator/admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_poll(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PollDetail>> {
    let Path((group_id, poll_id)) = path?;
    let repo = state.repo.as_ref();

    let guarded = guard_resource(
        repo,
        &caller,
        group_id,
        Policy::AuthorOrElevated,
        "Poll",
        repo.get_poll(group_id, poll_id),
    )
    .await?;

    let Json(body) = body?;
    let is_closed = require_bool(&body, "isClosed")?;

    repo.update_closed(guarded.resource.id, is_closed).await?;
    tracing::info!(%poll_id, is_closed, by = %caller.id, role = ?guarded.member.role, "poll state updated");

    Ok(Json(load_detail(repo, group_id, poll_id, caller.id).await?))
}

/// vote_on_poll
///
/// [Member Route] Casts the caller's single vote. Closed polls reject votes,
/// an option from another poll is 404, and a second vote is 400.
#[utoipa::path(
    post,
    path = "/groups/{id}/polls/{pollId}/vote",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("pollId" = Uuid, Path, description = "Poll ID")
    ),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = PollDetail),
        (status = 400, description = "Poll closed or already voted"),
        (status = 403, description = "Not a member"),
        (status = 404, description = "Poll or option not found")
    )
)]
pub async fn vote_on_poll(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> ApiResult<Json<PollDetail>> {
    let Path((group_id, poll_id)) = path?;
    let repo = state.repo.as_ref();

    let guarded = guard_resource(
        repo,
        &caller,
        group_id,
        Policy::AnyMember,
        "Poll",
        repo.get_poll(group_id, poll_id),
    )
    .await?;

    let Json(req) = body?;
    if guarded.resource.is_closed {
        return Err(ApiError::bad_request("This poll is closed"));
    }

    if !repo.cast_vote(poll_id, req.option_id, caller.id).await? {
        return Err(ApiError::not_found("Option not found"));
    }

    Ok(Json(load_detail(repo, group_id, poll_id, caller.id).await?))
}
