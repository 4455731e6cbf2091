use crate::{
    AppState,
    handlers::{
        connections, events, forum, groups, messages, notifications, polls,
        upload::{self, UPLOAD_BODY_LIMIT},
        users,
    },
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the session middleware applied in
/// `create_router`, so handlers always receive a resolved `AuthUser`.
///
/// Routes under `/groups/{id}` are additionally member-only: the handler runs
/// the membership guard before touching the resource and answers 403 to
/// non-members whether or not the group exists.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(users::get_me))
        // --- Groups & Membership ---
        .route(
            "/groups",
            get(groups::list_my_groups).post(groups::create_group),
        )
        .route("/groups/{id}", get(groups::get_group))
        // POST /groups/{id}/join
        // The only group route a non-member may call.
        .route("/groups/{id}/join", post(groups::join_group))
        .route("/groups/{id}/members/me", delete(groups::leave_group))
        // --- Forum ---
        .route(
            "/groups/{id}/forum",
            get(forum::list_forum_posts).post(forum::create_forum_post),
        )
        // PATCH /groups/{id}/forum/{postId}
        // Author or OWNER/ADMIN toggles `isResolved`.
        .route(
            "/groups/{id}/forum/{post_id}",
            get(forum::get_forum_post).patch(forum::update_forum_post),
        )
        .route(
            "/groups/{id}/forum/{post_id}/replies",
            post(forum::add_forum_reply),
        )
        // --- Polls ---
        .route(
            "/groups/{id}/polls",
            get(polls::list_polls).post(polls::create_poll),
        )
        // PATCH /groups/{id}/polls/{pollId}
        // Creator or OWNER/ADMIN opens/closes the poll.
        .route(
            "/groups/{id}/polls/{poll_id}",
            get(polls::get_poll).patch(polls::update_poll),
        )
        .route(
            "/groups/{id}/polls/{poll_id}/vote",
            post(polls::vote_on_poll),
        )
        // --- Calendar & Chat ---
        .route(
            "/groups/{id}/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/groups/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        // --- Per-user counters ---
        .route("/users/events/count", get(events::count_my_events))
        .route("/users/forum-posts/count", get(forum::count_my_forum_posts))
        .route("/users/messages/count", get(messages::count_my_messages))
        // --- Connections ---
        .route(
            "/users/connections",
            get(connections::list_connections).post(connections::request_connection),
        )
        // PATCH answers a pending request from {userId}; DELETE withdraws the
        // pending request of the pair in either direction.
        .route(
            "/users/connections/{user_id}",
            patch(connections::respond_to_connection).delete(connections::cancel_connection),
        )
        // --- Notifications ---
        .route(
            "/notifications",
            get(notifications::list_notifications).patch(notifications::mark_notifications),
        )
        // POST /upload
        // Multipart, one `file` part, at most 10 MiB. The body cap is raised
        // just above the file limit so the handler reports oversize as 400.
        .route(
            "/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
