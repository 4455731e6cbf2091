use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod validation;

// Public and session-protected routers.
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{IdentityProvider, IdentityState, JwtIdentityProvider};
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::health_check, handlers::users::socket_placeholder,
        handlers::users::get_me,
        handlers::groups::list_my_groups, handlers::groups::create_group,
        handlers::groups::get_group, handlers::groups::join_group,
        handlers::groups::leave_group,
        handlers::forum::list_forum_posts, handlers::forum::create_forum_post,
        handlers::forum::get_forum_post, handlers::forum::update_forum_post,
        handlers::forum::add_forum_reply, handlers::forum::count_my_forum_posts,
        handlers::polls::list_polls, handlers::polls::create_poll, handlers::polls::get_poll,
        handlers::polls::update_poll, handlers::polls::vote_on_poll,
        handlers::events::list_events, handlers::events::create_event,
        handlers::events::count_my_events,
        handlers::messages::list_messages, handlers::messages::send_message,
        handlers::messages::count_my_messages,
        handlers::notifications::list_notifications,
        handlers::notifications::mark_notifications,
        handlers::connections::list_connections, handlers::connections::request_connection,
        handlers::connections::respond_to_connection,
        handlers::connections::cancel_connection,
        handlers::upload::upload_file
    ),
    components(
        schemas(
            error::ErrorBody,
            models::User, models::UserSummary, models::MemberRole, models::StudyGroup,
            models::StudyGroupMember, models::GroupMemberView, models::StudyGroupDetail,
            models::CreateGroupRequest,
            models::ForumReplyView, models::ForumPostDetail, models::ForumPostSummary,
            models::CreateForumPostRequest, models::CreateReplyRequest,
            models::UpdateForumPostRequest,
            models::PollOptionView, models::PollDetail, models::CreatePollRequest,
            models::VoteRequest, models::UpdatePollRequest,
            models::CalendarEvent, models::CreateEventRequest,
            models::MessageView, models::CreateMessageRequest,
            models::Notification, models::MarkNotificationsRequest,
            models::MarkNotificationsResponse,
            models::ConnectionStatus, models::Connection, models::ConnectionView,
            models::CreateConnectionRequest, models::RespondConnectionRequest,
            models::CountResponse, models::UploadResponse,
        )
    ),
    tags(
        (name = "study-hub", description = "Study group collaboration API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request. Each service sits
/// behind a trait object so tests can swap in in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: every per-entity repository contract.
    pub repo: RepositoryState,
    /// Upload storage (local directory in production).
    pub storage: StorageState,
    /// Resolves the calling user from request headers.
    pub identity: IdentityState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. A request without a valid session is
/// rejected with 401 by the `AuthUser` extractor before any handler (or body
/// extractor) runs. The resolved user is stashed in the request extensions so
/// the handler's own `AuthUser` argument does not resolve it a second time.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// create_router
///
/// Assembles public and authenticated routes, the Swagger UI, the static
/// `/uploads` directory and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let uploads = ServeDir::new(&state.config.upload_dir);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest_service("/uploads", uploads)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, uri and the `x-request-id` set by
/// `SetRequestIdLayer`, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
