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
    models::{CalendarEvent, CountResponse, CreateEventRequest},
    validation::{optional_text, required_text},
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 2_000;
const MAX_LOCATION_CHARS: usize = 200;

/// list_events
///
/// [Member Route] Calendar of a group, ordered by start time.
#[utoipa::path(
    get,
    path = "/groups/{id}/events",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Events", body = [CalendarEvent]),
        (status = 403, description = "Not a member")
    )
)]
pub async fn list_events(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;
    Ok(Json(repo.list_events(group_id).await?))
}

/// create_event
///
/// [Member Route] Schedules an event. `endsAt`, when given, may not precede `startsAt`.
#[utoipa::path(
    post,
    path = "/groups/{id}/events",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Created", body = CalendarEvent),
        (status = 400, description = "Invalid event"),
        (status = 403, description = "Not a member")
    )
)]
pub async fn create_event(
    caller: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    let Path(group_id) = path?;
    let repo = state.repo.as_ref();
    require_member(repo, &caller, group_id).await?;

    let Json(req) = body?;
    if req.ends_at.is_some_and(|ends_at| ends_at < req.starts_at) {
        return Err(ApiError::bad_request("endsAt must not be before startsAt"));
    }
    let req = CreateEventRequest {
        title: required_text(&req.title, "title", MAX_TITLE_CHARS)?,
        description: optional_text(req.description, "description", MAX_DESCRIPTION_CHARS)?,
        location: optional_text(req.location, "location", MAX_LOCATION_CHARS)?,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
    };

    let event = repo.create_event(group_id, caller.id, req).await?;
    tracing::info!(event_id = %event.id, %group_id, "calendar event created");

    Ok((StatusCode::CREATED, Json(event)))
}

/// count_my_events
///
/// [Authenticated Route] Number of events the caller created, across all groups.
#[utoipa::path(
    get,
    path = "/users/events/count",
    responses((status = 200, description = "Count", body = CountResponse))
)]
pub async fn count_my_events(
    caller: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<CountResponse>> {
    let count = state.repo.count_events_by_creator(caller.id).await?;
    Ok(Json(CountResponse { count }))
}
