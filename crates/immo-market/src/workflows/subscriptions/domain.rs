use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::accounts::domain::{UserAccount, UserId};

/// Currency every plan price is quoted in.
pub const CURRENCY: &str = "XOF";

/// Identifier assigned by the store to a subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionRequestId(pub String);

impl fmt::Display for SubscriptionRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of subscription tiers offered to demarcheurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Trial,
    Basic,
    Premium,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Trial,
        SubscriptionPlan::Basic,
        SubscriptionPlan::Premium,
    ];

    /// Fixed price, in whole units of [`CURRENCY`].
    pub fn price(&self) -> u32 {
        match self {
            SubscriptionPlan::Trial => 0,
            SubscriptionPlan::Basic => 10_000,
            SubscriptionPlan::Premium => 25_000,
        }
    }

    /// Duration shown on the plan card. Approval grants `SubscriptionGrant::GRANT_DAYS`.
    pub fn advertised_days(&self) -> u32 {
        match self {
            SubscriptionPlan::Trial => 60,
            SubscriptionPlan::Basic => 30,
            SubscriptionPlan::Premium => 90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionPlan::Trial => "trial",
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Premium => "premium",
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown subscription plan '{0}' (expected trial, basic, or premium)")]
pub struct UnknownPlan(pub String);

impl FromStr for SubscriptionPlan {
    type Err = UnknownPlan;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(SubscriptionPlan::Trial),
            "basic" => Ok(SubscriptionPlan::Basic),
            "premium" => Ok(SubscriptionPlan::Premium),
            _ => Err(UnknownPlan(value.to_string())),
        }
    }
}

/// Review state. Only `Pending` may transition, and only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
        }
    }
}

/// Copy of the applicant's profile taken at submission time. Later profile edits do not
/// flow back into existing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSnapshot {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub zone: String,
    pub country: String,
}

impl ApplicantSnapshot {
    /// Snapshot a fully populated profile, or name the blank fields.
    pub fn capture(account: &UserAccount) -> Result<Self, Vec<&'static str>> {
        let missing = account.profile.missing_fields();
        if !missing.is_empty() {
            return Err(missing);
        }

        let profile = &account.profile;
        Ok(Self {
            user_id: account.id.clone(),
            name: profile.name.trim().to_string(),
            email: profile.email.trim().to_string(),
            phone: profile.phone.trim().to_string(),
            zone: profile.zone.trim().to_string(),
            country: profile.country.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub id: SubscriptionRequestId,
    pub applicant: ApplicantSnapshot,
    pub plan: SubscriptionPlan,
    pub amount: u32,
    pub status: RequestStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<UserId>,
}

impl SubscriptionRequest {
    /// Case-insensitive substring match over name, e-mail, phone, and zone.
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let applicant = &self.applicant;
        [
            &applicant.name,
            &applicant.email,
            &applicant.phone,
            &applicant.zone,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Insert payload; status fields and timestamps are set by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionRequest {
    pub applicant: ApplicantSnapshot,
    pub plan: SubscriptionPlan,
    pub amount: u32,
}
