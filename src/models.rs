use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// User
///
/// Canonical identity record from the `users` table. Every authored entity
/// references one of these.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserSummary
///
/// The author block nested into posts, replies, polls, messages and connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

// --- Groups & Membership ---

/// MemberRole
///
/// Role of a user inside one group. Maps to the Postgres `member_role` enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "member_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
}

impl MemberRole {
    /// OWNER and ADMIN may act on records they did not author.
    pub fn is_elevated(self) -> bool {
        self != MemberRole::Member
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudyGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub owner_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// StudyGroupMember
///
/// Membership row, unique per (user, group). The presence of this row is what
/// the authorization guard checks.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudyGroupMember {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: MemberRole,
    #[ts(type = "string")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GroupMemberView {
    pub user: UserSummary,
    pub role: MemberRole,
    #[ts(type = "string")]
    pub joined_at: DateTime<Utc>,
}

/// StudyGroupDetail
///
/// Response of `GET /groups/{id}`: the group plus its member list.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StudyGroupDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub owner_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub members: Vec<GroupMemberView>,
}

impl StudyGroupDetail {
    pub fn new(group: StudyGroup, members: Vec<GroupMemberView>) -> Self {
        Self {
            id: group.id,
            name: group.name,
            description: group.description,
            course_code: group.course_code,
            course_name: group.course_name,
            owner_id: group.owner_id,
            created_at: group.created_at,
            members,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub course_name: Option<String>,
}

// --- Forum ---

/// ForumPost
///
/// Raw `forum_posts` row. Handlers never return it directly; they re-fetch a
/// `ForumPostDetail` after mutating.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct ForumPost {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ForumReplyView {
    pub id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: UserSummary,
}

/// ForumPostDetail
///
/// A post with its author and replies in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ForumPostDetail {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_resolved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author: UserSummary,
    pub replies: Vec<ForumReplyView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ForumPostSummary {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_resolved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: UserSummary,
    #[ts(type = "number")]
    pub reply_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateForumPostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateReplyRequest {
    pub content: String,
}

/// Body of `PATCH /groups/{id}/forum/{postId}`. Validated field by field from
/// raw JSON; this type documents the shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateForumPostRequest {
    pub is_resolved: bool,
}

// --- Polls ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Poll {
    pub id: Uuid,
    pub group_id: Uuid,
    pub creator_id: Uuid,
    pub question: String,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PollOptionView {
    pub id: Uuid,
    pub text: String,
    #[ts(type = "number")]
    pub vote_count: i64,
}

/// PollDetail
///
/// A poll with options in display order, per-option tallies and the viewing
/// user's own vote (if any).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PollDetail {
    pub id: Uuid,
    pub group_id: Uuid,
    pub question: String,
    pub is_closed: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub creator: UserSummary,
    pub options: Vec<PollOptionView>,
    #[ts(type = "number")]
    pub total_votes: i64,
    pub user_vote: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VoteRequest {
    pub option_id: Uuid,
}

/// Body of `PATCH /groups/{id}/polls/{pollId}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePollRequest {
    pub is_closed: bool,
}

// --- Calendar ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub group_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[ts(type = "string")]
    pub starts_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[ts(type = "string")]
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub ends_at: Option<DateTime<Utc>>,
}

// --- Chat ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MessageView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub sender: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateMessageRequest {
    pub content: String,
}

// --- Notifications ---

/// Notification
///
/// Maps to the `notifications` table. `type` is a reserved word, so the column
/// is read into `notification_type` and serialized back as `type`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification; never received over HTTP.
#[derive(Debug, Clone, Default)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

/// Body of `PATCH /notifications`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarkNotificationsRequest {
    pub notification_ids: Vec<Uuid>,
    pub mark_as_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarkNotificationsResponse {
    #[ts(type = "number")]
    pub updated_count: u64,
}

// --- Connections ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ConnectionStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Connection {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: ConnectionStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConnectionView {
    pub id: Uuid,
    pub sender: UserSummary,
    pub receiver: UserSummary,
    pub status: ConnectionStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateConnectionRequest {
    pub receiver_id: Uuid,
}

/// Body of `PATCH /users/connections/{userId}`: `"accepted"` or `"declined"`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RespondConnectionRequest {
    pub status: ConnectionStatus,
}

// --- Misc responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CountResponse {
    #[ts(type = "number")]
    pub count: i64,
}

/// UploadResponse
///
/// Returned by `POST /upload` once the file is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadResponse {
    pub file_name: String,
    pub file_url: String,
    #[ts(type = "number")]
    pub file_size: u64,
    pub file_type: String,
    #[ts(type = "string")]
    pub uploaded_at: DateTime<Utc>,
}
