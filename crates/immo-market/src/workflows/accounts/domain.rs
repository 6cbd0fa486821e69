use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::subscriptions::domain::SubscriptionPlan;

/// Stable identity issued by the identity provider and used as the user record key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access tier stored on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    /// Field agent who canvasses and publishes listings.
    Demarcheur,
    Client,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Demarcheur => "demarcheur",
            Role::Client => "client",
        }
    }
}

/// Contact details captured at registration and editable by the owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub country: String,
}

impl UserProfile {
    /// Names of the fields still blank, in display order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("zone", &self.zone),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Subscription currently granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionGrant {
    pub plan: SubscriptionPlan,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl SubscriptionGrant {
    /// Every approved plan is granted for this many days, whatever its advertised duration.
    pub const GRANT_DAYS: i64 = 30;

    pub fn starting(plan: SubscriptionPlan, starts_at: DateTime<Utc>) -> Self {
        Self {
            plan,
            starts_at,
            ends_at: starts_at + Duration::days(Self::GRANT_DAYS),
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub role: Role,
    pub profile: UserProfile,
    #[serde(default)]
    pub subscription: Option<SubscriptionGrant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|grant| grant.is_active_at(now))
    }
}

/// Registration payload; the store assigns the id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub role: Role,
    pub profile: UserProfile,
}

/// Account view returned by `/me`.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: UserId,
    pub role: &'static str,
    pub profile: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionGrant>,
    pub subscription_active: bool,
}

impl AccountView {
    pub fn at(account: &UserAccount, now: DateTime<Utc>) -> Self {
        Self {
            id: account.id.clone(),
            role: account.role.label(),
            profile: account.profile.clone(),
            subscription: account.subscription.clone(),
            subscription_active: account.has_active_subscription(now),
        }
    }
}
