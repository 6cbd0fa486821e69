use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::RepositoryError;
use crate::config::NotificationConfig;
use crate::workflows::accounts::domain::{NewUser, Role, UserAccount, UserId, UserProfile};
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::listings::domain::{Listing, ListingDraft, ListingId, ListingStatus};
use crate::workflows::listings::repository::ListingRepository;
use crate::workflows::notifications::domain::{
    ChangeKind, NewNotification, Notification, NotificationChange, NotificationId,
};
use crate::workflows::notifications::repository::NotificationStore;
use crate::workflows::subscriptions::domain::{
    NewSubscriptionRequest, PaymentStatus, RequestStatus, SubscriptionRequest,
    SubscriptionRequestId,
};
use crate::workflows::subscriptions::repository::{
    ReviewCommit, ReviewDecision, ReviewOutcome, ReviewReceipt, SubscriptionStore,
};

#[derive(Default)]
struct Collections {
    sequence: u64,
    users: BTreeMap<UserId, UserAccount>,
    requests: BTreeMap<SubscriptionRequestId, SubscriptionRequest>,
    notifications: BTreeMap<NotificationId, Notification>,
    listings: BTreeMap<ListingId, Listing>,
}

impl Collections {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}-{:06}", self.sequence)
    }

    fn notification_with_key(&self, key: &str) -> Option<&Notification> {
        self.notifications
            .values()
            .find(|notification| notification.idempotency_key.as_deref() == Some(key))
    }

    fn append_notification(
        &mut self,
        new: NewNotification,
        at: DateTime<Utc>,
    ) -> (Notification, bool) {
        if let Some(existing) = new
            .idempotency_key
            .as_deref()
            .and_then(|key| self.notification_with_key(key))
        {
            return (existing.clone(), false);
        }

        let notification = Notification {
            id: NotificationId(self.next_id("ntf")),
            recipient: new.recipient,
            kind: new.kind,
            title: new.title,
            message: new.message,
            read: false,
            created_at: at,
            data: new.data,
            idempotency_key: new.idempotency_key,
        };
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        (notification, true)
    }
}

/// Document store holding every collection behind one lock, so a review commit spanning
/// requests, users, and notifications is a single critical section.
pub struct MemoryStore {
    collections: Mutex<Collections>,
    changes: broadcast::Sender<NotificationChange>,
}

impl MemoryStore {
    pub fn new(config: NotificationConfig) -> Self {
        let (changes, _) = broadcast::channel(config.feed_capacity.max(1));
        Self {
            collections: Mutex::new(Collections::default()),
            changes,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.collections
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    /// Callers hold the collections guard, so events leave in the same order as the writes.
    fn publish(&self, kind: ChangeKind, notification: &Notification) {
        // No live listeners is not an error.
        let _ = self.changes.send(NotificationChange {
            kind,
            notification: notification.clone(),
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

/// Numeric part of a store-assigned id, so `lst-1000000` ranks after `lst-999999`.
fn sequence_of(id: &str) -> u64 {
    id.rsplit('-')
        .next()
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

impl UserDirectory for MemoryStore {
    fn insert_user(
        &self,
        user: NewUser,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.lock()?;
        let email = user.profile.email.trim();
        let taken = guard
            .users
            .values()
            .any(|existing| existing.profile.email.trim().eq_ignore_ascii_case(email));
        if taken {
            return Err(RepositoryError::AlreadyExists);
        }

        let account = UserAccount {
            id: UserId(guard.next_id("usr")),
            role: user.role,
            profile: user.profile,
            subscription: None,
            created_at: at,
            updated_at: at,
        };
        guard.users.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.users.get(id).cloned())
    }

    fn update_profile(
        &self,
        id: &UserId,
        profile: UserProfile,
        at: DateTime<Utc>,
    ) -> Result<UserAccount, RepositoryError> {
        let mut guard = self.lock()?;
        let email = profile.email.trim();
        let taken = guard.users.values().any(|existing| {
            &existing.id != id && existing.profile.email.trim().eq_ignore_ascii_case(email)
        });
        if taken {
            return Err(RepositoryError::AlreadyExists);
        }

        let account = guard.users.get_mut(id).ok_or(RepositoryError::NotFound)?;
        account.profile = profile;
        account.updated_at = at;
        Ok(account.clone())
    }

    fn users_with_role(&self, role: Role) -> Result<Vec<UserAccount>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .filter(|account| account.role == role)
            .cloned()
            .collect())
    }
}

impl SubscriptionStore for MemoryStore {
    fn insert_request(
        &self,
        request: NewSubscriptionRequest,
        at: DateTime<Utc>,
    ) -> Result<SubscriptionRequest, RepositoryError> {
        let mut guard = self.lock()?;
        let open = guard.requests.values().any(|existing| {
            existing.applicant.user_id == request.applicant.user_id
                && existing.status.is_pending()
        });
        if open {
            return Err(RepositoryError::AlreadyExists);
        }

        let stored = SubscriptionRequest {
            id: SubscriptionRequestId(guard.next_id("req")),
            applicant: request.applicant,
            plan: request.plan,
            amount: request.amount,
            status: RequestStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: at,
            updated_at: at,
            reviewed_by: None,
        };
        guard.requests.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    fn fetch_request(
        &self,
        id: &SubscriptionRequestId,
    ) -> Result<Option<SubscriptionRequest>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.requests.get(id).cloned())
    }

    fn requests_newest_first(&self) -> Result<Vec<SubscriptionRequest>, RepositoryError> {
        let guard = self.lock()?;
        let requests = guard.requests.values().cloned().collect();
        Ok(newest_first(requests, |request: &SubscriptionRequest| {
            (request.created_at, sequence_of(&request.id.0))
        }))
    }

    fn commit_review(&self, commit: ReviewCommit) -> Result<ReviewOutcome, RepositoryError> {
        let ReviewCommit {
            request_id,
            reviewer,
            reviewed_at,
            decision,
        } = commit;

        let mut guard = self.lock()?;

        let current = guard
            .requests
            .get(&request_id)
            .ok_or(RepositoryError::NotFound)?;
        if !current.status.is_pending() {
            return Ok(ReviewOutcome::StatusMismatch(current.status));
        }
        let applicant = current.applicant.user_id.clone();

        let (receipt, added) = match decision {
            ReviewDecision::Approve {
                grant,
                notification,
            } => {
                if !guard.users.contains_key(&applicant) {
                    return Err(RepositoryError::NotFound);
                }

                // Every precondition holds; from here on the writes cannot fail.
                let request = guard
                    .requests
                    .get_mut(&request_id)
                    .ok_or(RepositoryError::NotFound)?;
                request.status = RequestStatus::Approved;
                request.payment_status = PaymentStatus::Confirmed;
                request.updated_at = reviewed_at;
                request.reviewed_by = Some(reviewer);
                let request = request.clone();

                if let Some(user) = guard.users.get_mut(&applicant) {
                    user.subscription = Some(grant);
                    user.updated_at = reviewed_at;
                }

                let (notification, added) = guard.append_notification(notification, reviewed_at);
                (
                    ReviewReceipt {
                        request,
                        notification: Some(notification),
                    },
                    added,
                )
            }
            ReviewDecision::Reject => {
                let request = guard
                    .requests
                    .get_mut(&request_id)
                    .ok_or(RepositoryError::NotFound)?;
                request.status = RequestStatus::Rejected;
                request.updated_at = reviewed_at;
                request.reviewed_by = Some(reviewer);
                (
                    ReviewReceipt {
                        request: request.clone(),
                        notification: None,
                    },
                    false,
                )
            }
        };

        if added {
            if let Some(notification) = &receipt.notification {
                self.publish(ChangeKind::Added, notification);
            }
        }
        drop(guard);
        Ok(ReviewOutcome::Applied(receipt))
    }
}

impl NotificationStore for MemoryStore {
    fn insert_notification(
        &self,
        notification: NewNotification,
        at: DateTime<Utc>,
    ) -> Result<Notification, RepositoryError> {
        let mut guard = self.lock()?;
        let (notification, added) = guard.append_notification(notification, at);
        if added {
            self.publish(ChangeKind::Added, &notification);
        }
        Ok(notification)
    }

    fn fetch_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.notifications.get(id).cloned())
    }

    fn notifications_for(
        &self,
        recipient: &UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let guard = self.lock()?;
        let matching = guard
            .notifications
            .values()
            .filter(|notification| &notification.recipient == recipient)
            .filter(|notification| !unread_only || !notification.read)
            .cloned()
            .collect();
        Ok(newest_first(matching, |notification: &Notification| {
            (notification.created_at, sequence_of(&notification.id.0))
        }))
    }

    fn mark_notification_read(
        &self,
        id: &NotificationId,
    ) -> Result<Notification, RepositoryError> {
        let mut guard = self.lock()?;
        let notification = guard
            .notifications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        let changed = !notification.read;
        notification.read = true;
        let notification = notification.clone();
        if changed {
            self.publish(ChangeKind::Modified, &notification);
        }
        Ok(notification)
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<NotificationChange> {
        self.changes.subscribe()
    }
}

impl ListingRepository for MemoryStore {
    fn insert_listing(
        &self,
        owner: &UserId,
        draft: ListingDraft,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError> {
        let mut guard = self.lock()?;
        let listing = Listing {
            id: ListingId(guard.next_id("lst")),
            owner: owner.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            kind: draft.kind,
            transaction: draft.transaction,
            price: draft.price,
            city: draft.city.trim().to_string(),
            zone: draft.zone.trim().to_string(),
            bedrooms: draft.bedrooms,
            area_sqm: draft.area_sqm,
            status: ListingStatus::Published,
            created_at: at,
            updated_at: at,
        };
        guard.listings.insert(listing.id.clone(), listing.clone());
        Ok(listing)
    }

    fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.listings.get(id).cloned())
    }

    fn listings_newest_first(&self) -> Result<Vec<Listing>, RepositoryError> {
        let guard = self.lock()?;
        let listings = guard.listings.values().cloned().collect();
        Ok(newest_first(listings, |listing: &Listing| {
            (listing.created_at, sequence_of(&listing.id.0))
        }))
    }

    fn set_listing_status(
        &self,
        id: &ListingId,
        status: ListingStatus,
        at: DateTime<Utc>,
    ) -> Result<Listing, RepositoryError> {
        let mut guard = self.lock()?;
        let listing = guard.listings.get_mut(id).ok_or(RepositoryError::NotFound)?;
        listing.status = status;
        listing.updated_at = at;
        Ok(listing.clone())
    }
}
