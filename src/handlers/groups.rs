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
    guard::require_member,
    models::{CreateGroupRequest, MemberRole, StudyGroup, StudyGroupDetail, StudyGroupMember},
    repository::Repository,
    validation::{optional_text, required_text},
};

const MAX_NAME_CHARS: usize = 120;
const MAX_DESCRIPTION_CHARS: usize = 2_000;
const MAX_COURSE_CHARS: usize = 120;

async fn load_detail(repo: &dyn Repository, group_id: Uuid) -> ApiResult<StudyGroupDetail> {
    let group = repo
        .get_group(group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Study group not found"))?;
    let members = repo.list_members(group_id).await?;
    Ok(StudyGroupDetail::new(group, members))
}

/// list_my_groups
///
/// [Authenticated Route] Groups the caller belongs to, in any role.
#[utoipa::path(
    get,
    path = "/groups",
    responses(
        (status = 200, description = "Caller's groups", body = [StudyGroup]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_my_groups(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<StudyGroup>>> {
    Ok(Json(state.repo.list_groups_for_user(caller.id).await?))
}

/// create_group
///
/// [Authenticated Route] Creates a group; the caller becomes its OWNER in the
/// same statement.
#[utoipa::path(
    post,
    path = "/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Created", body = StudyGroupDetail),
        (status = 400, description = "Invalid name")
    )
)]
pub async fn create_group(
    caller: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StudyGroupDetail>)> {
    let Json(req) = body?;
    let req = CreateGroupRequest {
        name: required_text(&req.name, "name", MAX_NAME_CHARS)?,
        description: optional_text(req.description, "description", MAX_DESCRIPTION_CHARS)?,
        course_code: optional_text(req.course_code, "courseCode", MAX_COURSE_CHARS)?,
        course_name: optional_text(req.course_name, "courseName", MAX_COURSE_CHARS)?,
    };

    let repo = state.repo.as_ref();
    let group = repo.create_group(caller.id, req).await?;
    tracing::info!(group_id = %group.id, owner = %caller.id, "study group created");

    Ok((StatusCode::CREATED, Json(load_detail(repo, group.id).await?)))
}

/// get_group
///
/// [Member Route] Group detail with its member list.
#[utoipa::path(
    get,
    path = "/groups/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group", body = StudyGroupDetail),
        (status = 403, description = "Not a member")
    )
)]
pub async fn get_group(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<StudyGroupDetail>> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(load_detail(repo, group_id).await?))
}

/// join_group
///
/// [Authenticated Route] Adds the caller as a MEMBER. Unlike the member
/// routes, an unknown group is a 404 here since no membership exists yet.
#[utoipa::path(
    post,
    path = "/groups/{id}/join",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 201, description = "Joined", body = StudyGroupMember),
        (status = 400, description = "Already a member"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn join_group(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<(StatusCode, Json<StudyGroupMember>)> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();

    if repo.get_group(group_id).await?.is_none() {
        return Err(ApiError::not_found("Study group not found"));
    }
    if repo.get_membership(caller.id, group_id).await?.is_some() {
        return Err(ApiError::bad_request("You are already a member of this group"));
    }

    let member = repo
        .add_member(group_id, caller.id, MemberRole::Member)
        .await?;
    tracing::info!(%group_id, user_id = %caller.id, "member joined");

    Ok((StatusCode::CREATED, Json(member)))
}

/// leave_group
///
/// [Member Route] Removes the caller's membership. The OWNER cannot leave.
#[utoipa::path(
    delete,
    path = "/groups/{id}/members/me",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Left the group"),
        (status = 400, description = "Owner cannot leave"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn leave_group(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    let member = require_member(repo, &caller, group_id).await?;

    if member.role == MemberRole::Owner {
        return Err(ApiError::bad_request("The group owner cannot leave the group"));
    }

    repo.remove_member(group_id, caller.id).await?;
    tracing::info!(%group_id, user_id = %caller.id, "member left");

    Ok(StatusCode::NO_CONTENT)
}
