#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use study_hub::{
    AppConfig, AppState, MockStorageService,
    auth::{AuthUser, IdentityState, JwtIdentityProvider},
    models::{
        CalendarEvent, Connection, ConnectionStatus, ConnectionView, CreateEventRequest,
        CreateGroupRequest, ForumPost, ForumPostDetail, ForumPostSummary, ForumReplyView,
        GroupMemberView, MemberRole, MessageView, NewNotification, Notification, Poll,
        PollDetail, PollOptionView, StudyGroup, StudyGroupMember, User, UserSummary,
    },
    repository::{
        ConnectionRepository, EventRepository, ForumRepository, GroupRepository,
        MessageRepository, NotificationRepository, PollRepository, RepoError, RepoResult,
        RepositoryState, UserRepository,
    },
    storage::StorageState,
};
use uuid::Uuid;

// --- In-memory repository ---
//
// Mirrors the Postgres adapter's observable behaviour (ordering, scoping,
// uniqueness conflicts) so handlers can be exercised without a database.

#[derive(Clone)]
struct ReplyRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
struct OptionRow {
    id: Uuid,
    poll_id: Uuid,
    text: String,
}

#[derive(Clone)]
struct VoteRow {
    poll_id: Uuid,
    option_id: Uuid,
    user_id: Uuid,
}

#[derive(Clone)]
struct MessageRow {
    id: Uuid,
    group_id: Uuid,
    sender_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

struct Store {
    clock: DateTime<Utc>,
    users: Vec<User>,
    groups: Vec<StudyGroup>,
    members: Vec<StudyGroupMember>,
    posts: Vec<ForumPost>,
    replies: Vec<ReplyRow>,
    polls: Vec<Poll>,
    options: Vec<OptionRow>,
    votes: Vec<VoteRow>,
    events: Vec<CalendarEvent>,
    messages: Vec<MessageRow>,
    notifications: Vec<Notification>,
    connections: Vec<Connection>,
}

impl Store {
    /// Strictly increasing timestamps so ordering assertions are deterministic.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::seconds(1);
        self.clock
    }

    fn summary(&self, user_id: Uuid) -> UserSummary {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(UserSummary::from)
            .unwrap_or_else(|| UserSummary {
                id: user_id,
                ..UserSummary::default()
            })
    }

    fn poll_detail(&self, poll: &Poll, viewer_id: Uuid) -> PollDetail {
        let options: Vec<PollOptionView> = self
            .options
            .iter()
            .filter(|o| o.poll_id == poll.id)
            .map(|o| PollOptionView {
                id: o.id,
                text: o.text.clone(),
                vote_count: self.votes.iter().filter(|v| v.option_id == o.id).count() as i64,
            })
            .collect();
        let total_votes = options.iter().map(|o| o.vote_count).sum();
        let user_vote = self
            .votes
            .iter()
            .find(|v| v.poll_id == poll.id && v.user_id == viewer_id)
            .map(|v| v.option_id);

        PollDetail {
            id: poll.id,
            group_id: poll.group_id,
            question: poll.question.clone(),
            is_closed: poll.is_closed,
            created_at: poll.created_at,
            creator: self.summary(poll.creator_id),
            options,
            total_votes,
            user_vote,
        }
    }

    fn message_view(&self, row: &MessageRow) -> MessageView {
        MessageView {
            id: row.id,
            group_id: row.group_id,
            content: row.content.clone(),
            created_at: row.created_at,
            sender: self.summary(row.sender_id),
        }
    }
}

pub struct InMemoryRepo {
    store: Mutex<Store>,
    /// When set, every notification insert fails with a database error.
    pub fail_notifications: bool,
    /// When set, every user lookup fails with a database error.
    pub fail_user_lookups: bool,
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self {
            store: Mutex::new(Store {
                clock: Utc::now(),
                users: vec![],
                groups: vec![],
                members: vec![],
                posts: vec![],
                replies: vec![],
                polls: vec![],
                options: vec![],
                votes: vec![],
                events: vec![],
                messages: vec![],
                notifications: vec![],
                connections: vec![],
            }),
            fail_notifications: false,
            fail_user_lookups: false,
        }
    }
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_notifications() -> Self {
        Self {
            fail_notifications: true,
            ..Self::default()
        }
    }

    pub fn with_failing_user_lookups() -> Self {
        Self {
            fail_user_lookups: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("in-memory store poisoned")
    }

    // --- Seeding helpers ---

    pub fn seed_user(&self, name: &str) -> User {
        let mut store = self.lock();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.edu", name.to_lowercase()),
            image: None,
            created_at: store.tick(),
        };
        store.users.push(user.clone());
        user
    }

    /// A group owned by `owner`, with the OWNER membership row.
    pub fn seed_group(&self, owner: &User) -> StudyGroup {
        let mut store = self.lock();
        let now = store.tick();
        let group = StudyGroup {
            id: Uuid::new_v4(),
            name: "Algorithms".to_string(),
            description: None,
            course_code: Some("CS201".to_string()),
            course_name: None,
            owner_id: owner.id,
            created_at: now,
        };
        store.groups.push(group.clone());
        store.members.push(StudyGroupMember {
            user_id: owner.id,
            group_id: group.id,
            role: MemberRole::Owner,
            joined_at: now,
        });
        group
    }

    pub fn seed_member(&self, group: &StudyGroup, user: &User, role: MemberRole) {
        let mut store = self.lock();
        let joined_at = store.tick();
        store.members.push(StudyGroupMember {
            user_id: user.id,
            group_id: group.id,
            role,
            joined_at,
        });
    }

    pub fn seed_post(&self, group: &StudyGroup, author: &User) -> ForumPost {
        let mut store = self.lock();
        let now = store.tick();
        let post = ForumPost {
            id: Uuid::new_v4(),
            group_id: group.id,
            author_id: author.id,
            title: "How do heaps work?".to_string(),
            content: "Stuck on sift-down.".to_string(),
            is_resolved: false,
            created_at: now,
            updated_at: now,
        };
        store.posts.push(post.clone());
        post
    }

    /// Returns the poll and its option ids in display order.
    pub fn seed_poll(&self, group: &StudyGroup, creator: &User, options: &[&str]) -> (Poll, Vec<Uuid>) {
        let mut store = self.lock();
        let poll = Poll {
            id: Uuid::new_v4(),
            group_id: group.id,
            creator_id: creator.id,
            question: "When do we meet?".to_string(),
            is_closed: false,
            created_at: store.tick(),
        };
        let ids: Vec<Uuid> = options
            .iter()
            .map(|text| {
                let id = Uuid::new_v4();
                store.options.push(OptionRow {
                    id,
                    poll_id: poll.id,
                    text: text.to_string(),
                });
                id
            })
            .collect();
        store.polls.push(poll.clone());
        (poll, ids)
    }

    pub fn seed_notification(&self, user: &User, is_read: bool) -> Notification {
        let mut store = self.lock();
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user.id,
            notification_type: "forum_reply".to_string(),
            title: "New reply".to_string(),
            message: "Someone replied".to_string(),
            link: None,
            is_read,
            created_at: store.tick(),
        };
        store.notifications.push(notification.clone());
        notification
    }

    pub fn seed_connection(
        &self,
        sender: &User,
        receiver: &User,
        status: ConnectionStatus,
    ) -> Connection {
        let mut store = self.lock();
        let now = store.tick();
        let connection = Connection {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            receiver_id: receiver.id,
            status,
            created_at: now,
            updated_at: now,
        };
        store.connections.push(connection.clone());
        connection
    }

    // --- Inspection helpers ---

    pub fn post(&self, post_id: Uuid) -> Option<ForumPost> {
        self.lock().posts.iter().find(|p| p.id == post_id).cloned()
    }

    pub fn poll(&self, poll_id: Uuid) -> Option<Poll> {
        self.lock().polls.iter().find(|p| p.id == poll_id).cloned()
    }

    pub fn notification(&self, id: Uuid) -> Option<Notification> {
        self.lock().notifications.iter().find(|n| n.id == id).cloned()
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn all_connections(&self) -> Vec<Connection> {
        self.lock().connections.clone()
    }

    pub fn membership(&self, user_id: Uuid, group_id: Uuid) -> Option<StudyGroupMember> {
        self.lock()
            .members
            .iter()
            .find(|m| m.user_id == user_id && m.group_id == group_id)
            .cloned()
    }

    pub fn vote_count(&self, poll_id: Uuid) -> usize {
        self.lock().votes.iter().filter(|v| v.poll_id == poll_id).count()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepo {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        if self.fail_user_lookups {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl GroupRepository for InMemoryRepo {
    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> RepoResult<Option<StudyGroupMember>> {
        Ok(self.membership(user_id, group_id))
    }

    async fn get_group(&self, group_id: Uuid) -> RepoResult<Option<StudyGroup>> {
        Ok(self.lock().groups.iter().find(|g| g.id == group_id).cloned())
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> RepoResult<Vec<StudyGroup>> {
        let store = self.lock();
        let mut groups: Vec<StudyGroup> = store
            .groups
            .iter()
            .filter(|g| {
                store
                    .members
                    .iter()
                    .any(|m| m.group_id == g.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    async fn create_group(
        &self,
        owner_id: Uuid,
        req: CreateGroupRequest,
    ) -> RepoResult<StudyGroup> {
        let mut store = self.lock();
        let now = store.tick();
        let group = StudyGroup {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            course_code: req.course_code,
            course_name: req.course_name,
            owner_id,
            created_at: now,
        };
        store.groups.push(group.clone());
        store.members.push(StudyGroupMember {
            user_id: owner_id,
            group_id: group.id,
            role: MemberRole::Owner,
            joined_at: now,
        });
        Ok(group)
    }

    async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> RepoResult<StudyGroupMember> {
        let mut store = self.lock();
        if store
            .members
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Err(RepoError::Conflict(
                "You are already a member of this group".to_string(),
            ));
        }
        let member = StudyGroupMember {
            user_id,
            group_id,
            role,
            joined_at: store.tick(),
        };
        store.members.push(member.clone());
        Ok(member)
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.members.len();
        store
            .members
            .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
        Ok(store.members.len() < before)
    }

    async fn list_members(&self, group_id: Uuid) -> RepoResult<Vec<GroupMemberView>> {
        let store = self.lock();
        Ok(store
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .map(|m| GroupMemberView {
                user: store.summary(m.user_id),
                role: m.role,
                joined_at: m.joined_at,
            })
            .collect())
    }
}

#[async_trait]
impl ForumRepository for InMemoryRepo {
    async fn list_posts(&self, group_id: Uuid) -> RepoResult<Vec<ForumPostSummary>> {
        let store = self.lock();
        let mut posts: Vec<ForumPostSummary> = store
            .posts
            .iter()
            .filter(|p| p.group_id == group_id)
            .map(|p| ForumPostSummary {
                id: p.id,
                group_id: p.group_id,
                title: p.title.clone(),
                content: p.content.clone(),
                is_resolved: p.is_resolved,
                created_at: p.created_at,
                author: store.summary(p.author_id),
                reply_count: store.replies.iter().filter(|r| r.post_id == p.id).count() as i64,
            })
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn create_post(
        &self,
        group_id: Uuid,
        author_id: Uuid,
        title: String,
        content: String,
    ) -> RepoResult<ForumPost> {
        let mut store = self.lock();
        let now = store.tick();
        let post = ForumPost {
            id: Uuid::new_v4(),
            group_id,
            author_id,
            title,
            content,
            is_resolved: false,
            created_at: now,
            updated_at: now,
        };
        store.posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, group_id: Uuid, post_id: Uuid) -> RepoResult<Option<ForumPost>> {
        Ok(self
            .lock()
            .posts
            .iter()
            .find(|p| p.id == post_id && p.group_id == group_id)
            .cloned())
    }

    async fn get_post_detail(
        &self,
        group_id: Uuid,
        post_id: Uuid,
    ) -> RepoResult<Option<ForumPostDetail>> {
        let store = self.lock();
        let Some(post) = store
            .posts
            .iter()
            .find(|p| p.id == post_id && p.group_id == group_id)
        else {
            return Ok(None);
        };
        let replies = store
            .replies
            .iter()
            .filter(|r| r.post_id == post.id)
            .map(|r| ForumReplyView {
                id: r.id,
                content: r.content.clone(),
                created_at: r.created_at,
                author: store.summary(r.author_id),
            })
            .collect();
        Ok(Some(ForumPostDetail {
            id: post.id,
            group_id: post.group_id,
            title: post.title.clone(),
            content: post.content.clone(),
            is_resolved: post.is_resolved,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author: store.summary(post.author_id),
            replies,
        }))
    }

    async fn update_resolution(&self, post_id: Uuid, is_resolved: bool) -> RepoResult<()> {
        let mut store = self.lock();
        let now = store.tick();
        if let Some(post) = store.posts.iter_mut().find(|p| p.id == post_id) {
            post.is_resolved = is_resolved;
            post.updated_at = now;
        }
        Ok(())
    }

    async fn add_reply(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> RepoResult<ForumReplyView> {
        let mut store = self.lock();
        let row = ReplyRow {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            created_at: store.tick(),
        };
        store.replies.push(row.clone());
        Ok(ForumReplyView {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            author: store.summary(author_id),
        })
    }

    async fn count_posts_by_author(&self, author_id: Uuid) -> RepoResult<i64> {
        Ok(self
            .lock()
            .posts
            .iter()
            .filter(|p| p.author_id == author_id)
            .count() as i64)
    }
}

#[async_trait]
impl PollRepository for InMemoryRepo {
    async fn list_polls(&self, group_id: Uuid, viewer_id: Uuid) -> RepoResult<Vec<PollDetail>> {
        let store = self.lock();
        let mut polls: Vec<&Poll> = store.polls.iter().filter(|p| p.group_id == group_id).collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls
            .into_iter()
            .map(|p| store.poll_detail(p, viewer_id))
            .collect())
    }

    async fn create_poll(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        question: String,
        options: Vec<String>,
    ) -> RepoResult<Poll> {
        let mut store = self.lock();
        let poll = Poll {
            id: Uuid::new_v4(),
            group_id,
            creator_id,
            question,
            is_closed: false,
            created_at: store.tick(),
        };
        for text in options {
            store.options.push(OptionRow {
                id: Uuid::new_v4(),
                poll_id: poll.id,
                text,
            });
        }
        store.polls.push(poll.clone());
        Ok(poll)
    }

    async fn get_poll(&self, group_id: Uuid, poll_id: Uuid) -> RepoResult<Option<Poll>> {
        Ok(self
            .lock()
            .polls
            .iter()
            .find(|p| p.id == poll_id && p.group_id == group_id)
            .cloned())
    }

    async fn get_poll_detail(
        &self,
        group_id: Uuid,
        poll_id: Uuid,
        viewer_id: Uuid,
    ) -> RepoResult<Option<PollDetail>> {
        let store = self.lock();
        Ok(store
            .polls
            .iter()
            .find(|p| p.id == poll_id && p.group_id == group_id)
            .map(|p| store.poll_detail(p, viewer_id)))
    }

    async fn update_closed(&self, poll_id: Uuid, is_closed: bool) -> RepoResult<()> {
        if let Some(poll) = self.lock().polls.iter_mut().find(|p| p.id == poll_id) {
            poll.is_closed = is_closed;
        }
        Ok(())
    }

    async fn cast_vote(&self, poll_id: Uuid, option_id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        if !store
            .options
            .iter()
            .any(|o| o.id == option_id && o.poll_id == poll_id)
        {
            return Ok(false);
        }
        if store
            .votes
            .iter()
            .any(|v| v.poll_id == poll_id && v.user_id == user_id)
        {
            return Err(RepoError::Conflict(
                "You have already voted in this poll".to_string(),
            ));
        }
        store.votes.push(VoteRow {
            poll_id,
            option_id,
            user_id,
        });
        Ok(true)
    }
}

#[async_trait]
impl EventRepository for InMemoryRepo {
    async fn list_events(&self, group_id: Uuid) -> RepoResult<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = self
            .lock()
            .events
            .iter()
            .filter(|e| e.group_id == group_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        Ok(events)
    }

    async fn create_event(
        &self,
        group_id: Uuid,
        creator_id: Uuid,
        req: CreateEventRequest,
    ) -> RepoResult<CalendarEvent> {
        let mut store = self.lock();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            group_id,
            creator_id,
            title: req.title,
            description: req.description,
            location: req.location,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
            created_at: store.tick(),
        };
        store.events.push(event.clone());
        Ok(event)
    }

    async fn count_events_by_creator(&self, creator_id: Uuid) -> RepoResult<i64> {
        Ok(self
            .lock()
            .events
            .iter()
            .filter(|e| e.creator_id == creator_id)
            .count() as i64)
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepo {
    async fn list_messages(&self, group_id: Uuid, limit: i64) -> RepoResult<Vec<MessageView>> {
        let store = self.lock();
        let rows: Vec<&MessageRow> = store
            .messages
            .iter()
            .filter(|m| m.group_id == group_id)
            .collect();
        let skip = rows.len().saturating_sub(limit.max(0) as usize);
        Ok(rows
            .into_iter()
            .skip(skip)
            .map(|row| store.message_view(row))
            .collect())
    }

    async fn create_message(
        &self,
        group_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> RepoResult<MessageView> {
        let mut store = self.lock();
        let row = MessageRow {
            id: Uuid::new_v4(),
            group_id,
            sender_id,
            content,
            created_at: store.tick(),
        };
        store.messages.push(row.clone());
        Ok(store.message_view(&row))
    }

    async fn count_messages_by_sender(&self, sender_id: Uuid) -> RepoResult<i64> {
        Ok(self
            .lock()
            .messages
            .iter()
            .filter(|m| m.sender_id == sender_id)
            .count() as i64)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryRepo {
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> RepoResult<Vec<Notification>> {
        let mut rows: Vec<Notification> = self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn set_read_state(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        is_read: bool,
    ) -> RepoResult<u64> {
        let mut updated = 0;
        for n in self.lock().notifications.iter_mut() {
            if n.user_id == user_id && notification_ids.contains(&n.id) {
                n.is_read = is_read;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<Notification> {
        if self.fail_notifications {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut store = self.lock();
        let row = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            notification_type: notification.notification_type,
            title: notification.title,
            message: notification.message,
            link: notification.link,
            is_read: false,
            created_at: store.tick(),
        };
        store.notifications.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryRepo {
    async fn list_connections(&self, user_id: Uuid) -> RepoResult<Vec<ConnectionView>> {
        let store = self.lock();
        let mut rows: Vec<ConnectionView> = store
            .connections
            .iter()
            .filter(|c| c.sender_id == user_id || c.receiver_id == user_id)
            .map(|c| ConnectionView {
                id: c.id,
                sender: store.summary(c.sender_id),
                receiver: store.summary(c.receiver_id),
                status: c.status,
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn create_connection(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> RepoResult<Connection> {
        let mut store = self.lock();
        let same_pair = |c: &Connection| {
            (c.sender_id == sender_id && c.receiver_id == receiver_id)
                || (c.sender_id == receiver_id && c.receiver_id == sender_id)
        };
        if store
            .connections
            .iter()
            .any(|c| c.status == ConnectionStatus::Pending && same_pair(c))
        {
            return Err(RepoError::Conflict(
                "A pending connection request already exists".to_string(),
            ));
        }
        let now = store.tick();
        let connection = Connection {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.connections.push(connection.clone());
        Ok(connection)
    }

    async fn respond_to_connection(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        status: ConnectionStatus,
    ) -> RepoResult<Option<Connection>> {
        let mut store = self.lock();
        let now = store.tick();
        Ok(store
            .connections
            .iter_mut()
            .find(|c| {
                c.sender_id == sender_id
                    && c.receiver_id == receiver_id
                    && c.status == ConnectionStatus::Pending
            })
            .map(|c| {
                c.status = status;
                c.updated_at = now;
                c.clone()
            }))
    }

    async fn delete_pending_connection(&self, user_a: Uuid, user_b: Uuid) -> RepoResult<bool> {
        let mut store = self.lock();
        let before = store.connections.len();
        store.connections.retain(|c| {
            let same_pair = (c.sender_id == user_a && c.receiver_id == user_b)
                || (c.sender_id == user_b && c.receiver_id == user_a);
            !(same_pair && c.status == ConnectionStatus::Pending)
        });
        Ok(store.connections.len() < before)
    }
}

// --- State helpers ---

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

/// AppState wired to the in-memory repository, the mock storage and the real
/// JWT identity provider (local env, so the `x-user-id` bypass is active).
pub fn create_test_state(repo: Arc<InMemoryRepo>, storage: MockStorageService) -> AppState {
    create_test_state_with_config(repo, storage, AppConfig::default())
}

pub fn create_test_state_with_config(
    repo: Arc<InMemoryRepo>,
    storage: MockStorageService,
    config: AppConfig,
) -> AppState {
    let repo = repo as RepositoryState;
    let identity =
        Arc::new(JwtIdentityProvider::new(repo.clone(), config.clone())) as IdentityState;
    AppState {
        repo,
        storage: Arc::new(storage) as StorageState,
        identity,
        config,
    }
}

/// Members, one per role, of a freshly seeded group.
pub struct GroupFixture {
    pub repo: Arc<InMemoryRepo>,
    pub group: StudyGroup,
    pub owner: User,
    pub admin: User,
    pub member: User,
    pub outsider: User,
}

pub fn group_fixture() -> GroupFixture {
    let repo = Arc::new(InMemoryRepo::new());
    let owner = repo.seed_user("Olivia");
    let admin = repo.seed_user("Adam");
    let member = repo.seed_user("Mia");
    let outsider = repo.seed_user("Oscar");
    let group = repo.seed_group(&owner);
    repo.seed_member(&group, &admin, MemberRole::Admin);
    repo.seed_member(&group, &member, MemberRole::Member);
    GroupFixture {
        repo,
        group,
        owner,
        admin,
        member,
        outsider,
    }
}
