//! Authorization guard shared by every group-scoped route.
//!
//! A caller without a membership row gets 403 regardless of whether the group
//! exists, so the guard never leaks group existence.

use std::future::Future;

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{ForumPost, Poll, StudyGroupMember},
    repository::{RepoResult, Repository},
};

/// Records that have a single author (or creator) inside a group.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}

impl Authored for ForumPost {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Poll {
    fn author_id(&self) -> Uuid {
        self.creator_id
    }
}

/// Who may act on a resource once membership is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any member of the group.
    AnyMember,
    /// The record's author, or an OWNER/ADMIN of the group.
    AuthorOrElevated,
}

/// A resource that passed the guard, with the membership that authorized it.
#[derive(Debug)]
pub struct Guarded<T> {
    pub member: StudyGroupMember,
    pub resource: T,
}

/// require_member
///
/// Loads the caller's membership in `group_id`. Absence is `Forbidden`, never
/// `NotFound`.
pub async fn require_member(
    repo: &dyn Repository,
    caller: &AuthUser,
    group_id: Uuid,
) -> Result<StudyGroupMember, ApiError> {
    repo.get_membership(caller.id, group_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You are not a member of this group"))
}

/// ensure_author_or_elevated
///
/// `record.author == caller || member.role != MEMBER`.
pub fn ensure_author_or_elevated(
    caller: &AuthUser,
    member: &StudyGroupMember,
    record: &impl Authored,
) -> Result<(), ApiError> {
    if record.author_id() == caller.id || member.role.is_elevated() {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Only the author or a group admin can perform this action",
        ))
    }
}

/// guard_resource
///
/// The shared "load membership → load resource → check role" sequence of the
/// group-scoped mutation routes. `lookup` is only awaited once membership is
/// confirmed; a missing resource becomes `NotFound("<label> not found")`.
pub async fn guard_resource<T, F>(
    repo: &dyn Repository,
    caller: &AuthUser,
    group_id: Uuid,
    policy: Policy,
    label: &str,
    lookup: F,
) -> Result<Guarded<T>, ApiError>
where
    T: Authored,
    F: Future<Output = RepoResult<Option<T>>>,
{
    let member = require_member(repo, caller, group_id).await?;

    let resource = lookup
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{label} not found")))?;

    if policy == Policy::AuthorOrElevated {
        ensure_author_or_elevated(caller, &member, &resource)?;
    }

    Ok(Guarded { member, resource })
}
