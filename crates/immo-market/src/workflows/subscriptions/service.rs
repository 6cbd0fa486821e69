use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{
    ApplicantSnapshot, NewSubscriptionRequest, RequestStatus, SubscriptionPlan,
    SubscriptionRequest, SubscriptionRequestId, CURRENCY,
};
use super::repository::{
    RequestFilter, ReviewCommit, ReviewDecision, ReviewEntry, ReviewOutcome, ReviewReceipt,
    SubscriptionStore,
};
use crate::auth::{self, AccessError, Principal};
use crate::store::RepositoryError;
use crate::workflows::accounts::domain::{Role, SubscriptionGrant};
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::notifications::domain::NewNotification;

pub const INCOMPLETE_PROFILE_MESSAGE: &str = "Incomplete user data, refresh the page.";

/// Validated plan selection awaiting confirmation. Nothing has been written yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionDraft {
    applicant: ApplicantSnapshot,
    plan: SubscriptionPlan,
    amount: u32,
    currency: &'static str,
}

impl SubmissionDraft {
    pub fn applicant(&self) -> &ApplicantSnapshot {
        &self.applicant
    }

    pub fn plan(&self) -> SubscriptionPlan {
        self.plan
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }
}

/// Service composing request submission, the admin review console, and the approval commit.
pub struct SubscriptionService<S: ?Sized> {
    store: Arc<S>,
}

impl<S> SubscriptionService<S>
where
    S: SubscriptionStore + UserDirectory + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Select step: snapshot the caller's profile and price the plan.
    ///
    /// An incomplete profile is refused here, before any write is attempted.
    pub fn prepare(
        &self,
        principal: &Principal,
        plan: SubscriptionPlan,
    ) -> Result<SubmissionDraft, SubmissionError> {
        let account = auth::resolve(&*self.store, principal)?;
        let applicant = ApplicantSnapshot::capture(&account).map_err(|missing| {
            warn!(user = %account.id, ?missing, "subscription request refused: incomplete profile");
            SubmissionError::IncompleteProfile { missing }
        })?;

        Ok(SubmissionDraft {
            applicant,
            plan,
            amount: plan.price(),
            currency: CURRENCY,
        })
    }

    /// Confirm step: persist the draft as a pending request.
    pub fn confirm(&self, draft: SubmissionDraft) -> Result<SubscriptionRequest, SubmissionError> {
        let SubmissionDraft {
            applicant,
            plan,
            amount,
            ..
        } = draft;

        let request = self
            .store
            .insert_request(
                NewSubscriptionRequest {
                    applicant,
                    plan,
                    amount,
                },
                Utc::now(),
            )
            .map_err(|err| {
                error!(error = %err, "subscription request insert failed");
                err
            })?;

        info!(request = %request.id, user = %request.applicant.user_id, plan = %request.plan, "subscription request submitted");
        Ok(request)
    }

    /// Every request, newest first, narrowed in memory by `filter`.
    pub fn review_queue(
        &self,
        principal: &Principal,
        filter: &RequestFilter,
    ) -> Result<Vec<ReviewEntry>, ReviewError> {
        auth::require_admin(&*self.store, principal)?;
        let requests = self.store.requests_newest_first()?;
        Ok(filter
            .apply(requests)
            .into_iter()
            .map(ReviewEntry::from)
            .collect())
    }

    /// Fetch one request; applicants see their own, admins see all.
    pub fn get(
        &self,
        principal: &Principal,
        id: &SubscriptionRequestId,
    ) -> Result<SubscriptionRequest, ReviewError> {
        let account = auth::resolve(&*self.store, principal)?;
        let request = self
            .store
            .fetch_request(id)?
            .ok_or_else(|| ReviewError::NotFound(id.clone()))?;
        if request.applicant.user_id != account.id && account.role != Role::Admin {
            return Err(AccessError::Forbidden {
                role: Role::Admin.label(),
            }
            .into());
        }
        Ok(request)
    }

    /// Approve a pending request: status, user grant, and applicant notification are
    /// committed together or not at all.
    pub fn approve(
        &self,
        principal: &Principal,
        id: &SubscriptionRequestId,
    ) -> Result<ReviewReceipt, ReviewError> {
        let admin = auth::require_admin(&*self.store, principal)?;
        let request = self.pending_request(id)?;

        let now = Utc::now();
        let grant = SubscriptionGrant::starting(request.plan, now);
        let notification = NewNotification::subscription_created(&request, &grant);
        let receipt = self.commit(ReviewCommit {
            request_id: request.id.clone(),
            reviewer: admin.id.clone(),
            reviewed_at: now,
            decision: ReviewDecision::Approve {
                grant,
                notification,
            },
        })?;

        info!(request = %id, reviewer = %admin.id, plan = %request.plan, "subscription request approved");
        Ok(receipt)
    }

    /// Reject a pending request. The applicant is not notified.
    pub fn reject(
        &self,
        principal: &Principal,
        id: &SubscriptionRequestId,
    ) -> Result<ReviewReceipt, ReviewError> {
        let admin = auth::require_admin(&*self.store, principal)?;
        let request = self.pending_request(id)?;

        let receipt = self.commit(ReviewCommit {
            request_id: request.id,
            reviewer: admin.id.clone(),
            reviewed_at: Utc::now(),
            decision: ReviewDecision::Reject,
        })?;

        info!(request = %id, reviewer = %admin.id, "subscription request rejected");
        Ok(receipt)
    }

    /// Render the filtered review queue as CSV for offline reconciliation.
    pub fn export_csv(
        &self,
        principal: &Principal,
        filter: &RequestFilter,
    ) -> Result<String, ReviewError> {
        let entries = self.review_queue(principal, filter)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in &entries {
            let request = &entry.request;
            writer
                .serialize(ExportRow {
                    id: &request.id.0,
                    created_at: request.created_at.to_rfc3339(),
                    name: &request.applicant.name,
                    email: &request.applicant.email,
                    phone: &request.applicant.phone,
                    zone: &request.applicant.zone,
                    country: &request.applicant.country,
                    plan: request.plan.label(),
                    amount: request.amount,
                    currency: CURRENCY,
                    status: request.status.label(),
                    payment_status: request.payment_status.label(),
                })
                .map_err(|err| ReviewError::Export(err.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| ReviewError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| ReviewError::Export(err.to_string()))
    }

    /// Early read so a stale action gets a precise answer. The commit re-checks the status
    /// under the store's lock; this read is not what guards against double review.
    fn pending_request(
        &self,
        id: &SubscriptionRequestId,
    ) -> Result<SubscriptionRequest, ReviewError> {
        let request = self
            .store
            .fetch_request(id)?
            .ok_or_else(|| ReviewError::NotFound(id.clone()))?;
        if !request.status.is_pending() {
            return Err(ReviewError::AlreadyReviewed(request.status));
        }
        Ok(request)
    }

    fn commit(&self, commit: ReviewCommit) -> Result<ReviewReceipt, ReviewError> {
        let request_id = commit.request_id.clone();
        match self.store.commit_review(commit) {
            Ok(ReviewOutcome::Applied(receipt)) => Ok(receipt),
            Ok(ReviewOutcome::StatusMismatch(status)) => {
                warn!(request = %request_id, status = status.label(), "review lost the race");
                Err(ReviewError::AlreadyReviewed(status))
            }
            Err(RepositoryError::NotFound) => Err(ReviewError::NotFound(request_id)),
            Err(err) => {
                error!(request = %request_id, error = %err, "review commit failed");
                Err(err.into())
            }
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    created_at: String,
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    zone: &'a str,
    country: &'a str,
    plan: &'static str,
    amount: u32,
    currency: &'static str,
    status: &'static str,
    payment_status: &'static str,
}

/// Error raised while submitting a request.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("incomplete user data, missing {missing:?}")]
    IncompleteProfile { missing: Vec<&'static str> },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Error raised by the admin review console.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("subscription request {0} not found")]
    NotFound(SubscriptionRequestId),
    #[error("subscription request already {}", .0.label())]
    AlreadyReviewed(RequestStatus),
    #[error("export failed: {0}")]
    Export(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
