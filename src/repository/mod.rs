use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CalendarEvent, Connection, ConnectionStatus, ConnectionView, CreateEventRequest,
    CreateGroupRequest, ForumPost, ForumPostDetail, ForumPostSummary, ForumReplyView,
    GroupMemberView, MemberRole, MessageView, NewNotification, Notification, Poll, PollDetail,
    StudyGroup, StudyGroupMember, User,
};

mod postgres;

pub use postgres::PostgresRepository;

/// RepoError
///
/// Failures surfaced by a persistence adapter. `Conflict` is reserved for
/// uniqueness constraints the schema enforces (one vote per poll, one pending
/// request per pair, one membership per group); everything else is opaque.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

// --- Per-entity contracts ---
//
// Each trait is deliberately narrow: the handlers and the guard only ever see
// these operations, never a query builder, so tests can swap in an in-memory
// adapter without a database.

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Membership lookup used by the authorization guard.
    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> RepoResult<Option<StudyGroupMember>>;
    async fn get_group(&self, group_id: Uuid) -> RepoResult<Option<StudyGroup>>;
    async fn list_groups_for_user(&self, user_id: Uuid) -> RepoResult<Vec<StudyGroup>>;
    /// Inserts the group and the owner's OWNER membership in one statement.
    async fn create_group(&self, owner_id: Uuid, req: CreateGroupRequest)
    -> RepoResult<StudyGroup>;
    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> RepoResult<StudyGroupMember>;
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> RepoResult<bool>;
    async fn list_members(&self, group_id: Uuid) -> RepoResult<Vec<GroupMemberView>>;
}

#[async_trait]
pub trait ForumRepository: Send + Sync {
    async fn list_posts(&self, group_id: Uuid) -> RepoResult<Vec<ForumPostSummary>>;
    async fn create_post(
        &self,
        group_id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> RepoResult<ForumPost>;
    /// Raw post, scoped to the group.
    async fn get_post(&self, group_id: Uuid, post_id: Uuid) -> RepoResult<Option<ForumPost>>;
    /// Post with author and replies (oldest reply first).
    async fn get_post_detail(
        &self,
        group_id: Uuid,
        post_id: Uuid,
    ) -> RepoResult<Option<ForumPostDetail>>;
    async fn update_resolution(&self, post_id: Uuid, is_resolved: bool) -> RepoResult<()>;
    async fn add_reply(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> RepoResult<ForumReplyView>;
    async fn count_posts_by_author(&self, author_id: Uuid) -> RepoResult<i64>;
}

#[async_trait]
pub trait PollRepository: Send + Sync {
    async fn list_polls(&self, group_id: Uuid, viewer_id: Uuid) -> RepoResult<Vec<PollDetail>>;
    async fn create_poll(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        question: String,
        options: Vec<String>,
    ) -> RepoResult<Poll>;
    async fn get_poll(&self, group_id: Uuid, poll_id: Uuid) -> RepoResult<Option<Poll>>;
    /// Poll with options, tallies and the viewer's own vote.
    async fn get_poll_detail(
        &self,
        group_id: Uuid,
        poll_id: Uuid,
        viewer_id: Uuid,
    ) -> RepoResult<Option<PollDetail>>;
    async fn update_closed(&self, poll_id: Uuid, is_closed: bool) -> RepoResult<()>;
    /// Returns `false` when the option does not belong to the poll.
    /// A second vote by the same user is a `Conflict`.
    async fn cast_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> RepoResult<bool>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn list_events(&self, group_id: Uuid) -> RepoResult<Vec<CalendarEvent>>;
    async fn create_event(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        req: CreateEventRequest,
    ) -> RepoResult<CalendarEvent>;
    async fn count_events_by_creator(&self, creator_id: Uuid) -> RepoResult<i64>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Latest `limit` messages, returned oldest first.
    async fn list_messages(&self, group_id: Uuid, limit: i64) -> RepoResult<Vec<MessageView>>;
    async fn create_message(
        &self,
        group_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> RepoResult<MessageView>;
    async fn count_messages_by_sender(&self, sender_id: Uuid) -> RepoResult<i64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Newest first, capped at `limit`.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> RepoResult<Vec<Notification>>;
    /// Updates only rows whose `user_id` is the caller; returns rows touched.
    async fn set_read_state(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        is_read: bool,
    ) -> RepoResult<u64>;
    async fn create_notification(&self, notification: NewNotification)
    -> RepoResult<Notification>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn list_connections(&self, user_id: Uuid) -> RepoResult<Vec<ConnectionView>>;
    /// A second pending request for the same unordered pair is a `Conflict`.
    async fn create_connection(&self, sender_id: Uuid, receiver_id: Uuid)
    -> RepoResult<Connection>;
    /// Moves the pending request sent by `sender_id` to `receiver_id` into `status`.
    async fn respond_to_connection(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        status: ConnectionStatus,
    ) -> RepoResult<Option<Connection>>;
    /// Deletes the pending connection of the unordered pair, if any.
    async fn delete_pending_connection(&self, user_a: Uuid, user_b: Uuid) -> RepoResult<bool>;
}

/// Repository
///
/// The full persistence surface the application state carries. Anything that
/// implements every per-entity trait is a `Repository`.
pub trait Repository:
    UserRepository
    + GroupRepository
    + ForumRepository
    + PollRepository
    + EventRepository
    + MessageRepository
    + NotificationRepository
    + ConnectionRepository
{
}

impl<T> Repository for T where
    T: UserRepository
        + GroupRepository
        + ForumRepository
        + PollRepository
        + EventRepository
        + MessageRepository
        + NotificationRepository
        + ConnectionRepository
{
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
