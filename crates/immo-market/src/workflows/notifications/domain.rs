use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::workflows::accounts::domain::{SubscriptionGrant, UserAccount, UserId};
use crate::workflows::listings::domain::Listing;
use crate::workflows::subscriptions::domain::SubscriptionRequest;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    UserRegistered,
    ListingCreated,
    SubscriptionCreated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Notification {
    /// Newest-first ordering key used by every unread query and the live feed.
    pub(crate) fn is_newer_than(&self, other: &Notification) -> bool {
        (self.created_at, &self.id) > (other.created_at, &other.id)
    }
}

/// Insert payload; the store assigns id, timestamp, and `read = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<Value>,
    pub idempotency_key: Option<String>,
}

impl NewNotification {
    /// Approval notice addressed to the applicant. Keyed by request id so a replayed
    /// approval cannot notify twice.
    pub fn subscription_created(request: &SubscriptionRequest, grant: &SubscriptionGrant) -> Self {
        Self {
            recipient: request.applicant.user_id.clone(),
            kind: NotificationKind::SubscriptionCreated,
            title: "Subscription activated".to_string(),
            message: format!(
                "Your {} subscription is active until {}.",
                request.plan,
                grant.ends_at.format("%Y-%m-%d")
            ),
            data: Some(json!({
                "request_id": request.id,
                "plan": request.plan,
                "ends_at": grant.ends_at,
            })),
            idempotency_key: Some(format!("subscription-approved:{}", request.id)),
        }
    }
}

/// Notification body without a recipient, used for fan-out to a whole role.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationTemplate {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Option<Value>,
}

impl NotificationTemplate {
    pub fn user_registered(account: &UserAccount) -> Self {
        Self {
            kind: NotificationKind::UserRegistered,
            title: "New user registered".to_string(),
            message: format!(
                "{} joined as {}.",
                account.profile.name,
                account.role.label()
            ),
            data: Some(json!({ "user_id": account.id })),
        }
    }

    pub fn listing_created(listing: &Listing) -> Self {
        Self {
            kind: NotificationKind::ListingCreated,
            title: "New listing published".to_string(),
            message: format!("{} in {}.", listing.title, listing.city),
            data: Some(json!({ "listing_id": listing.id, "owner": listing.owner })),
        }
    }

    pub fn addressed_to(&self, recipient: UserId) -> NewNotification {
        NewNotification {
            recipient,
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            data: self.data.clone(),
            idempotency_key: None,
        }
    }
}

/// How a record entered or changed within the notifications collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
}

/// One event on the store's notification change feed.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationChange {
    pub kind: ChangeKind,
    pub notification: Notification,
}
