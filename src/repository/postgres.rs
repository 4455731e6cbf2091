use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{
    ConnectionRepository, EventRepository, ForumRepository, GroupRepository, MessageRepository,
    NotificationRepository, PollRepository, RepoError, RepoResult, UserRepository,
};
use crate::models::{
    CalendarEvent, Connection, ConnectionStatus, ConnectionView, CreateEventRequest,
    CreateGroupRequest, ForumPost, ForumPostDetail, ForumPostSummary, ForumReplyView,
    GroupMemberView, MemberRole, MessageView, NewNotification, Notification, Poll,
    PollDetail, PollOptionView, StudyGroup, StudyGroupMember, User, UserSummary,
};

/// PostgresRepository
///
/// The concrete implementation of every repository trait, backed by PostgreSQL.
/// All statements are runtime-checked `sqlx` queries with bound parameters.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns a unique-constraint violation into a `Conflict` carrying `message`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(message.to_string())
        }
        _ => RepoError::Database(err),
    }
}

fn summary(id: Uuid, name: String, image: Option<String>) -> UserSummary {
    UserSummary { id, name, image }
}

// --- Joined row shapes ---

#[derive(FromRow)]
struct MemberRow {
    user_id: Uuid,
    user_name: String,
    user_image: Option<String>,
    role: MemberRole,
    joined_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct PostSummaryRow {
    id: Uuid,
    group_id: Uuid,
    title: String,
    content: String,
    is_resolved: bool,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_image: Option<String>,
    reply_count: i64,
}

#[derive(FromRow)]
struct PostDetailRow {
    id: Uuid,
    group_id: Uuid,
    title: String,
    content: String,
    is_resolved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_image: Option<String>,
}

#[derive(FromRow)]
struct ReplyRow {
    id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_name: String,
    author_image: Option<String>,
}

impl From<ReplyRow> for ForumReplyView {
    fn from(row: ReplyRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            author: summary(row.author_id, row.author_name, row.author_image),
        }
    }
}

#[derive(FromRow)]
struct PollRow {
    id: Uuid,
    group_id: Uuid,
    question: String,
    is_closed: bool,
    created_at: DateTime<Utc>,
    creator_id: Uuid,
    creator_name: String,
    creator_image: Option<String>,
}

#[derive(FromRow)]
struct OptionRow {
    id: Uuid,
    text: String,
    vote_count: i64,
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    group_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    sender_id: Uuid,
    sender_name: String,
    sender_image: Option<String>,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            content: row.content,
            created_at: row.created_at,
            sender: summary(row.sender_id, row.sender_name, row.sender_image),
        }
    }
}

#[derive(FromRow)]
struct ConnectionRow {
    id: Uuid,
    status: ConnectionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sender_id: Uuid,
    sender_name: String,
    sender_image: Option<String>,
    receiver_id: Uuid,
    receiver_name: String,
    receiver_image: Option<String>,
}

const POLL_SELECT: &str = r#"
    SELECT p.id, p.group_id, p.question, p.is_closed, p.created_at,
           u.id AS creator_id, u.name AS creator_name, u.image AS creator_image
    FROM polls p
    JOIN users u ON u.id = p.creator_id
"#;

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.group_id, m.content, m.created_at,
           u.id AS sender_id, u.name AS sender_name, u.image AS sender_image
    FROM messages m
    JOIN users u ON u.id = m.sender_id
"#;

impl PostgresRepository {
    /// assemble_poll
    ///
    /// Completes a poll row with its ordered options, tallies and the viewer's vote.
    async fn assemble_poll(&self, row: PollRow, viewer_id: Uuid) -> RepoResult<PollDetail> {
        let options = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT o.id, o.text, COUNT(v.user_id) AS vote_count
            FROM poll_options o
            LEFT JOIN poll_votes v ON v.option_id = o.id
            WHERE o.poll_id = $1
            GROUP BY o.id, o.text, o.position
            ORDER BY o.position ASC
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;

        let user_vote = sqlx::query_scalar::<_, Uuid>(
            "SELECT option_id FROM poll_votes WHERE poll_id = $1 AND user_id = $2",
        )
        .bind(row.id)
        .bind(viewer_id)
        .fetch_optional(&self.pool)
        .await?;

        let options: Vec<PollOptionView> = options
            .into_iter()
            .map(|o| PollOptionView {
                id: o.id,
                text: o.text,
                vote_count: o.vote_count,
            })
            .collect();
        let total_votes = options.iter().map(|o| o.vote_count).sum();

        Ok(PollDetail {
            id: row.id,
            group_id: row.group_id,
            question: row.question,
            is_closed: row.is_closed,
            created_at: row.created_at,
            creator: summary(row.creator_id, row.creator_name, row.creator_image),
            options,
            total_votes,
            user_vote,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, image, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl GroupRepository for PostgresRepository {
    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> RepoResult<Option<StudyGroupMember>> {
        let member = sqlx::query_as::<_, StudyGroupMember>(
            r#"SELECT user_id, group_id, role, joined_at
               FROM study_group_members
               WHERE user_id = $1 AND group_id = $2"#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn get_group(&self, group_id: Uuid) -> RepoResult<Option<StudyGroup>> {
        let group = sqlx::query_as::<_, StudyGroup>(
            r#"SELECT id, name, description, course_code, course_name, owner_id, created_at
               FROM study_groups WHERE id = $1"#,
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> RepoResult<Vec<StudyGroup>> {
        let groups = sqlx::query_as::<_, StudyGroup>(
            r#"
            SELECT g.id, g.name, g.description, g.course_code, g.course_name, g.owner_id, g.created_at
            FROM study_groups g
            JOIN study_group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// create_group
    ///
    /// Uses a CTE so the group row and the owner's membership are written by a
    /// single atomic statement.
    async fn create_group(
        &self,
        owner_id: Uuid,
        req: CreateGroupRequest,
    ) -> RepoResult<StudyGroup> {
        let group = sqlx::query_as::<_, StudyGroup>(
            r#"
            WITH inserted AS (
                INSERT INTO study_groups (id, name, description, course_code, course_name, owner_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                RETURNING id, name, description, course_code, course_name, owner_id, created_at
            ), owner_membership AS (
                INSERT INTO study_group_members (user_id, group_id, role, joined_at)
                SELECT owner_id, id, 'OWNER'::member_role, NOW() FROM inserted
            )
            SELECT id, name, description, course_code, course_name, owner_id, created_at
            FROM inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.description)
        .bind(req.course_code)
        .bind(req.course_name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> RepoResult<StudyGroupMember> {
        sqlx::query_as::<_, StudyGroupMember>(
            r#"INSERT INTO study_group_members (user_id, group_id, role, joined_at)
               VALUES ($1, $2, $3, NOW())
               RETURNING user_id, group_id, role, joined_at"#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You are already a member of this group"))
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM study_group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_members(&self, group_id: Uuid) -> RepoResult<Vec<GroupMemberView>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id AS user_id, u.name AS user_name, u.image AS user_image, m.role, m.joined_at
            FROM study_group_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| GroupMemberView {
                user: summary(r.user_id, r.user_name, r.user_image),
                role: r.role,
                joined_at: r.joined_at,
            })
            .collect())
    }
}

#[async_trait]
impl ForumRepository for PostgresRepository {
    async fn list_posts(&self, group_id: Uuid) -> RepoResult<Vec<ForumPostSummary>> {
        let rows = sqlx::query_as::<_, PostSummaryRow>(
            r#"
            SELECT p.id, p.group_id, p.title, p.content, p.is_resolved, p.created_at,
                   u.id AS author_id, u.name AS author_name, u.image AS author_image,
                   (SELECT COUNT(*) FROM forum_replies r WHERE r.post_id = p.id) AS reply_count
            FROM forum_posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.group_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ForumPostSummary {
                id: r.id,
                group_id: r.group_id,
                title: r.title,
                content: r.content,
                is_resolved: r.is_resolved,
                created_at: r.created_at,
                author: summary(r.author_id, r.author_name, r.author_image),
                reply_count: r.reply_count,
            })
            .collect())
    }

    async fn create_post(
        &self,
        group_id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> RepoResult<ForumPost> {
        let post = sqlx::query_as::<_, ForumPost>(
            r#"
            INSERT INTO forum_posts (id, group_id, author_id, title, content, is_resolved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, false, NOW(), NOW())
            RETURNING id, group_id, author_id, title, content, is_resolved, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post(&self, group_id: Uuid, post_id: Uuid) -> RepoResult<Option<ForumPost>> {
        let post = sqlx::query_as::<_, ForumPost>(
            r#"SELECT id, group_id, author_id, title, content, is_resolved, created_at, updated_at
               FROM forum_posts WHERE id = $1 AND group_id = $2"#,
        )
        .bind(post_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post_detail(
        &self,
        group_id: Uuid,
        post_id: Uuid,
    ) -> RepoResult<Option<ForumPostDetail>> {
        let Some(row) = sqlx::query_as::<_, PostDetailRow>(
            r#"
            SELECT p.id, p.group_id, p.title, p.content, p.is_resolved, p.created_at, p.updated_at,
                   u.id AS author_id, u.name AS author_name, u.image AS author_image
            FROM forum_posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1 AND p.group_id = $2
            "#,
        )
        .bind(post_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let replies = sqlx::query_as::<_, ReplyRow>(
            r#"
            SELECT r.id, r.content, r.created_at,
                   u.id AS author_id, u.name AS author_name, u.image AS author_image
            FROM forum_replies r
            JOIN users u ON u.id = r.author_id
            WHERE r.post_id = $1
            ORDER BY r.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ForumPostDetail {
            id: row.id,
            group_id: row.group_id,
            title: row.title,
            content: row.content,
            is_resolved: row.is_resolved,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: summary(row.author_id, row.author_name, row.author_image),
            replies: replies.into_iter().map(ForumReplyView::from).collect(),
        }))
    }

    async fn update_resolution(&self, post_id: Uuid, is_resolved: bool) -> RepoResult<()> {
        sqlx::query("UPDATE forum_posts SET is_resolved = $1, updated_at = NOW() WHERE id = $2")
            .bind(is_resolved)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// add_reply
    ///
    /// Inserts the reply and joins the author back in one round trip.
    async fn add_reply(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> RepoResult<ForumReplyView> {
        let row = sqlx::query_as::<_, ReplyRow>(
            r#"
            WITH inserted AS (
                INSERT INTO forum_replies (id, post_id, author_id, content, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                RETURNING id, author_id, content, created_at
            )
            SELECT i.id, i.content, i.created_at,
                   u.id AS author_id, u.name AS author_name, u.image AS author_image
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM forum_posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PollRepository for PostgresRepository {
    async fn list_polls(&self, group_id: Uuid, viewer_id: Uuid) -> RepoResult<Vec<PollDetail>> {
        let rows = sqlx::query_as::<_, PollRow>(&format!(
            "{POLL_SELECT} WHERE p.group_id = $1 ORDER BY p.created_at DESC"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let mut polls = Vec::with_capacity(rows.len());
        for row in rows {
            polls.push(self.assemble_poll(row, viewer_id).await?);
        }
        Ok(polls)
    }

    /// create_poll
    ///
    /// The poll and its options (kept in submission order via `position`) are
    /// written by one statement.
    async fn create_poll(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        question: String,
        options: Vec<String>,
    ) -> RepoResult<Poll> {
        let poll = sqlx::query_as::<_, Poll>(
            r#"
            WITH inserted AS (
                INSERT INTO polls (id, group_id, creator_id, question, is_closed, created_at)
                VALUES ($1, $2, $3, $4, false, NOW())
                RETURNING id, group_id, creator_id, question, is_closed, created_at
            ), inserted_options AS (
                INSERT INTO poll_options (poll_id, text, position)
                SELECT inserted.id, t.text, t.ord::int
                FROM inserted, unnest($5::text[]) WITH ORDINALITY AS t(text, ord)
            )
            SELECT id, group_id, creator_id, question, is_closed, created_at FROM inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(creator_id)
        .bind(question)
        .bind(options)
        .fetch_one(&self.pool)
        .await?;
        Ok(poll)
    }

    async fn get_poll(&self, group_id: Uuid, poll_id: Uuid) -> RepoResult<Option<Poll>> {
        let poll = sqlx::query_as::<_, Poll>(
            r#"SELECT id, group_id, creator_id, question, is_closed, created_at
               FROM polls WHERE id = $1 AND group_id = $2"#,
        )
        .bind(poll_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(poll)
    }

    async fn get_poll_detail(
        &self,
        group_id: Uuid,
        poll_id: Uuid,
        viewer_id: Uuid,
    ) -> RepoResult<Option<PollDetail>> {
        let row = sqlx::query_as::<_, PollRow>(&format!(
            "{POLL_SELECT} WHERE p.id = $1 AND p.group_id = $2"
        ))
        .bind(poll_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.assemble_poll(row, viewer_id).await?)),
            None => Ok(None),
        }
    }

    async fn update_closed(&self, poll_id: Uuid, is_closed: bool) -> RepoResult<()> {
        sqlx::query("UPDATE polls SET is_closed = $1 WHERE id = $2")
            .bind(is_closed)
            .bind(poll_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// cast_vote
    ///
    /// The insert only selects the option when it belongs to the poll, so a
    /// foreign option id affects zero rows. One-vote-per-user is left to the
    /// `UNIQUE (poll_id, user_id)` constraint.
    async fn cast_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO poll_votes (poll_id, option_id, user_id, created_at)
            SELECT $1, o.id, $3, NOW()
            FROM poll_options o
            WHERE o.id = $2 AND o.poll_id = $1
            "#,
        )
        .bind(poll_id)
        .bind(option_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already voted in this poll"))?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl EventRepository for PostgresRepository {
    async fn list_events(&self, group_id: Uuid) -> RepoResult<Vec<CalendarEvent>> {
        let events = sqlx::query_as::<_, CalendarEvent>(
            r#"SELECT id, group_id, creator_id, title, description, location, starts_at, ends_at, created_at
               FROM calendar_events WHERE group_id = $1 ORDER BY starts_at ASC"#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn create_event(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        req: CreateEventRequest,
    ) -> RepoResult<CalendarEvent> {
        let event = sqlx::query_as::<_, CalendarEvent>(
            r#"
            INSERT INTO calendar_events (id, group_id, creator_id, title, description, location, starts_at, ends_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING id, group_id, creator_id, title, description, location, starts_at, ends_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(creator_id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.location)
        .bind(req.starts_at)
        .bind(req.ends_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn count_events_by_creator(&self, creator_id: Uuid) -> RepoResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM calendar_events WHERE creator_id = $1")
                .bind(creator_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl MessageRepository for PostgresRepository {
    async fn list_messages(&self, group_id: Uuid, limit: i64) -> RepoResult<Vec<MessageView>> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT * FROM (
                {MESSAGE_SELECT}
                WHERE m.group_id = $1
                ORDER BY m.created_at DESC
                LIMIT $2
            ) latest
            ORDER BY created_at ASC
            "#
        ))
        .bind(group_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MessageView::from).collect())
    }

    async fn create_message(
        &self,
        group_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> RepoResult<MessageView> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (id, group_id, sender_id, content, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                RETURNING id, group_id, sender_id, content, created_at
            )
            SELECT i.id, i.group_id, i.content, i.created_at,
                   u.id AS sender_id, u.name AS sender_name, u.image AS sender_image
            FROM inserted i
            JOIN users u ON u.id = i.sender_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn count_messages_by_sender(&self, sender_id: Uuid) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE sender_id = $1")
            .bind(sender_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl NotificationRepository for PostgresRepository {
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> RepoResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, title, message, link, is_read, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// set_read_state
    ///
    /// The `user_id = $1` predicate is the ownership check: ids belonging to
    /// other users are silently ignored.
    async fn set_read_state(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        is_read: bool,
    ) -> RepoResult<u64> {
        let res = sqlx::query(
            "UPDATE notifications SET is_read = $3 WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(notification_ids.to_vec())
        .bind(is_read)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, type, title, message, link, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, NOW())
            RETURNING id, user_id, type, title, message, link, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.link)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }
}

#[async_trait]
impl ConnectionRepository for PostgresRepository {
    async fn list_connections(&self, user_id: Uuid) -> RepoResult<Vec<ConnectionView>> {
        let rows = sqlx::query_as::<_, ConnectionRow>(
            r#"
            SELECT c.id, c.status, c.created_at, c.updated_at,
                   s.id AS sender_id, s.name AS sender_name, s.image AS sender_image,
                   r.id AS receiver_id, r.name AS receiver_name, r.image AS receiver_image
            FROM connections c
            JOIN users s ON s.id = c.sender_id
            JOIN users r ON r.id = c.receiver_id
            WHERE c.sender_id = $1 OR c.receiver_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ConnectionView {
                id: r.id,
                sender: summary(r.sender_id, r.sender_name, r.sender_image),
                receiver: summary(r.receiver_id, r.receiver_name, r.receiver_image),
                status: r.status,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
            .collect())
    }

    async fn create_connection(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> RepoResult<Connection> {
        sqlx::query_as::<_, Connection>(
            r#"
            INSERT INTO connections (id, sender_id, receiver_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', NOW(), NOW())
            RETURNING id, sender_id, receiver_id, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A pending connection request already exists"))
    }

    async fn respond_to_connection(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        status: ConnectionStatus,
    ) -> RepoResult<Option<Connection>> {
        let updated = sqlx::query_as::<_, Connection>(
            r#"
            UPDATE connections SET status = $3, updated_at = NOW()
            WHERE sender_id = $1 AND receiver_id = $2 AND status = 'pending'
            RETURNING id, sender_id, receiver_id, status, created_at, updated_at
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_pending_connection(&self, user_a: Uuid, user_b: Uuid) -> RepoResult<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM connections
            WHERE status = 'pending'
              AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
