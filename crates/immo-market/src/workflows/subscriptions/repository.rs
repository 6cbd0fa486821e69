use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    NewSubscriptionRequest, RequestStatus, SubscriptionRequest, SubscriptionRequestId,
};
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::{SubscriptionGrant, UserId};
use crate::workflows::notifications::domain::{NewNotification, Notification};

/// Storage abstraction for the `subscriptionRequests` collection.
pub trait SubscriptionStore: Send + Sync {
    /// Insert a pending request. A user holding another pending request gets `AlreadyExists`.
    fn insert_request(
        &self,
        request: NewSubscriptionRequest,
        at: DateTime<Utc>,
    ) -> Result<SubscriptionRequest, RepositoryError>;
    fn fetch_request(
        &self,
        id: &SubscriptionRequestId,
    ) -> Result<Option<SubscriptionRequest>, RepositoryError>;
    fn requests_newest_first(&self) -> Result<Vec<SubscriptionRequest>, RepositoryError>;
    /// Apply a review as one transaction, conditioned on the request still being pending.
    ///
    /// Implementations must validate every document the commit touches before writing any
    /// of them, so a failed commit leaves the request, the user, and the notifications
    /// collection exactly as they were.
    fn commit_review(&self, commit: ReviewCommit) -> Result<ReviewOutcome, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCommit {
    pub request_id: SubscriptionRequestId,
    pub reviewer: UserId,
    pub reviewed_at: DateTime<Utc>,
    pub decision: ReviewDecision,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    /// Mark approved and confirmed, grant the subscription, notify the applicant.
    Approve {
        grant: SubscriptionGrant,
        notification: NewNotification,
    },
    /// Mark rejected; nothing else changes.
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Applied(ReviewReceipt),
    /// The request had already left `pending`; nothing was written.
    StatusMismatch(RequestStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReceipt {
    pub request: SubscriptionRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Admin console query: optional free-text search plus an optional status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestFilter {
    #[serde(default, alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            status: None,
        }
    }

    pub(crate) fn apply(&self, requests: Vec<SubscriptionRequest>) -> Vec<SubscriptionRequest> {
        let needle = self
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .unwrap_or_default();

        requests
            .into_iter()
            .filter(|request| self.status.map_or(true, |status| request.status == status))
            .filter(|request| request.matches_search(&needle))
            .collect()
    }
}

/// Row in the admin review console. Actions are offered only while the request is pending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewEntry {
    #[serde(flatten)]
    pub request: SubscriptionRequest,
    pub can_approve: bool,
    pub can_reject: bool,
}

impl From<SubscriptionRequest> for ReviewEntry {
    fn from(request: SubscriptionRequest) -> Self {
        let open = request.status.is_pending();
        Self {
            request,
            can_approve: open,
            can_reject: open,
        }
    }
}
