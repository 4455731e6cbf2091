//! HTTP handlers, one module per resource.
//!
//! Every handler follows the same order of checks: session (extractor) →
//! path/query identifiers → membership/role guard → resource lookup → body
//! shape → a single mutation → re-fetch with relations. Extractor rejections
//! for path, query and body are taken as `Result`s so they can be reported
//! only after the guard has run.

pub mod connections;
pub mod events;
pub mod forum;
pub mod groups;
pub mod messages;
pub mod notifications;
pub mod polls;
pub mod upload;
pub mod users;

use crate::{
    models::NewNotification,
    repository::Repository,
};

/// notify
///
/// Fan-out is best-effort: a failed insert is logged and never fails the
/// request that triggered it.
pub(crate) async fn notify(repo: &dyn Repository, notification: NewNotification) {
    let recipient = notification.user_id;
    let kind = notification.notification_type.clone();
    if let Err(e) = repo.create_notification(notification).await {
        tracing::warn!(error = %e, %recipient, %kind, "failed to create notification");
    }
}
