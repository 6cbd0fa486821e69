use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use super::domain::{Notification, NotificationId};
use super::listener::NotificationListener;
use super::repository::NotificationStore;
use crate::auth::{self, AccessError, Principal};
use crate::store::RepositoryError;
use crate::workflows::accounts::repository::UserDirectory;

/// Inbox operations for the authenticated recipient.
pub struct NotificationService<S: ?Sized> {
    store: Arc<S>,
}

/// Result of a per-record "mark all as read" sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkAllReport {
    pub updated: Vec<NotificationId>,
    pub failed: Vec<NotificationId>,
}

impl MarkAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<S> NotificationService<S>
where
    S: NotificationStore + UserDirectory + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append an unread notification addressed to `notification.recipient`. Production
    /// writers go through `emitter::fan_out` or the review commit instead.
    #[cfg(test)]
    pub(crate) fn emit(
        &self,
        notification: super::domain::NewNotification,
    ) -> Result<Notification, NotificationError> {
        let stored = self
            .store
            .insert_notification(notification, chrono::Utc::now())
            .map_err(|err| {
                error!(error = %err, "notification insert failed");
                err
            })?;
        info!(notification = %stored.id, recipient = %stored.recipient, kind = ?stored.kind, "notification emitted");
        Ok(stored)
    }

    pub fn unread(&self, principal: &Principal) -> Result<Vec<Notification>, NotificationError> {
        let account = auth::resolve(&*self.store, principal)?;
        Ok(self.store.notifications_for(&account.id, true)?)
    }

    pub fn inbox(&self, principal: &Principal) -> Result<Vec<Notification>, NotificationError> {
        let account = auth::resolve(&*self.store, principal)?;
        Ok(self.store.notifications_for(&account.id, false)?)
    }

    /// Mark one of the caller's notifications as read.
    pub fn mark_read(
        &self,
        principal: &Principal,
        id: &NotificationId,
    ) -> Result<Notification, NotificationError> {
        let account = auth::resolve(&*self.store, principal)?;
        let notification = self
            .store
            .fetch_notification(id)?
            .ok_or_else(|| NotificationError::NotFound(id.clone()))?;
        if notification.recipient != account.id {
            return Err(NotificationError::NotRecipient(id.clone()));
        }
        if notification.read {
            return Ok(notification);
        }
        Ok(self.store.mark_notification_read(id)?)
    }

    /// Issue one update per unread notification. Updates are independent: a failure leaves
    /// the remaining records untouched by it and is listed in the report.
    pub fn mark_all_read(&self, principal: &Principal) -> Result<MarkAllReport, NotificationError> {
        let account = auth::resolve(&*self.store, principal)?;
        let unread = self.store.notifications_for(&account.id, true)?;

        let mut report = MarkAllReport::default();
        for notification in unread {
            match self.store.mark_notification_read(&notification.id) {
                Ok(_) => report.updated.push(notification.id),
                Err(err) => {
                    error!(notification = %notification.id, error = %err, "mark as read failed");
                    report.failed.push(notification.id);
                }
            }
        }

        info!(user = %account.id, updated = report.updated.len(), failed = report.failed.len(), "mark all as read");
        Ok(report)
    }

    /// Open a live unread feed for the caller.
    pub fn listen(
        &self,
        principal: &Principal,
    ) -> Result<NotificationListener<S>, NotificationError> {
        let account = auth::resolve(&*self.store, principal)?;
        Ok(NotificationListener::start(self.store.clone(), account.id)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("notification {0} not found")]
    NotFound(NotificationId),
    #[error("notification {0} belongs to another user")]
    NotRecipient(NotificationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
