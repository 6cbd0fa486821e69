use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::domain::{NewNotification, Notification, NotificationChange, NotificationId};
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::UserId;

/// Storage abstraction for the `notifications` collection plus its live change feed.
pub trait NotificationStore: Send + Sync {
    /// Append an unread notification. When `idempotency_key` matches an existing record the
    /// existing record is returned and nothing is written.
    fn insert_notification(
        &self,
        notification: NewNotification,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError>;
    fn fetch_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError>;
    /// Notifications addressed to `recipient`, newest first.
    fn notifications_for(
        &self,
        recipient: &UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError>;
    fn mark_notification_read(&self, id: &NotificationId)
        -> Result<Notification, RepositoryError>;
    /// Subscribe to every added or modified notification from this point on.
    fn subscribe_changes(&self) -> broadcast::Receiver<NotificationChange>;
}
