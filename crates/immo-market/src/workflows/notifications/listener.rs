//! Live "unread notifications for me" feed.
//!
//! [`UnreadFeed`] is the pure state machine: it holds the recipient's unread set ordered newest
//! first and folds store change events into it. [`NotificationListener`] drives it from the
//! store's broadcast channel and resyncs from a fresh query whenever the channel lags.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, warn};

use super::domain::{ChangeKind, Notification, NotificationChange};
use super::repository::NotificationStore;
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::UserId;

/// State pushed to the client after every relevant change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEvent {
    pub unread_count: usize,
    pub unread: Vec<Notification>,
    /// Set only when a newly added notification lands at the front of the feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<Notification>,
}

#[derive(Debug, Clone)]
pub struct UnreadFeed {
    recipient: UserId,
    unread: Vec<Notification>,
}

impl UnreadFeed {
    pub fn new(recipient: UserId, initial: Vec<Notification>) -> Self {
        let mut feed = Self {
            recipient,
            unread: Vec::new(),
        };
        feed.reset(initial);
        feed
    }

    pub fn recipient(&self) -> &UserId {
        &self.recipient
    }

    pub fn unread(&self) -> &[Notification] {
        &self.unread
    }

    pub fn snapshot(&self) -> FeedEvent {
        self.event(None)
    }

    /// Replace the unread set wholesale, e.g. after a resync query.
    pub fn reset(&mut self, notifications: Vec<Notification>) {
        let recipient = &self.recipient;
        let mut unread: Vec<Notification> = notifications
            .into_iter()
            .filter(|notification| &notification.recipient == recipient && !notification.read)
            .collect();
        unread.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        self.unread = unread;
    }

    /// Fold one change into the feed. Returns `None` when the change does not affect it.
    pub fn apply(&mut self, change: &NotificationChange) -> Option<FeedEvent> {
        let incoming = &change.notification;
        if incoming.recipient != self.recipient {
            return None;
        }

        let previous = self
            .unread
            .iter()
            .position(|notification| notification.id == incoming.id);
        if let Some(index) = previous {
            self.unread.remove(index);
        }

        if incoming.read {
            // Read records leave the feed; a read record we never held changes nothing.
            return previous.map(|_| self.event(None));
        }

        let position = self
            .unread
            .iter()
            .position(|notification| incoming.is_newer_than(notification))
            .unwrap_or(self.unread.len());
        self.unread.insert(position, incoming.clone());

        let fresh = change.kind == ChangeKind::Added && previous.is_none();
        let toast = (fresh && position == 0).then(|| incoming.clone());
        Some(self.event(toast))
    }

    fn event(&self, toast: Option<Notification>) -> FeedEvent {
        FeedEvent {
            unread_count: self.unread.len(),
            unread: self.unread.clone(),
            toast,
        }
    }
}

/// Subscription to the store's change feed scoped to one recipient.
pub struct NotificationListener<S: ?Sized> {
    store: Arc<S>,
    receiver: broadcast::Receiver<NotificationChange>,
    feed: UnreadFeed,
}

impl<S> NotificationListener<S>
where
    S: NotificationStore + ?Sized,
{
    /// Subscribe first, then seed from a query, so no change between the two is lost.
    pub fn start(store: Arc<S>, recipient: UserId) -> Result<Self, RepositoryError> {
        let receiver = store.subscribe_changes();
        let unread = store.notifications_for(&recipient, true)?;
        Ok(Self {
            store,
            receiver,
            feed: UnreadFeed::new(recipient, unread),
        })
    }

    pub fn snapshot(&self) -> FeedEvent {
        self.feed.snapshot()
    }

    /// Wait for the next change that affects this recipient's unread set.
    ///
    /// Returns `None` once the store closes the channel or a resync query fails.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => {
                    if let Some(event) = self.feed.apply(&change) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(recipient = %self.feed.recipient(), skipped, "notification feed lagged, resyncing");
                    match self.store.notifications_for(self.feed.recipient(), true) {
                        Ok(unread) => {
                            self.feed.reset(unread);
                            return Some(self.feed.snapshot());
                        }
                        Err(err) => {
                            error!(recipient = %self.feed.recipient(), error = %err, "notification resync failed");
                            return None;
                        }
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
