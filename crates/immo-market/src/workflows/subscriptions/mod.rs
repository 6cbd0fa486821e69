//! Subscription requests: plan selection and submission by demarcheurs, review by admins.
//!
//! Approval and rejection are single conditional commits against the store, so a request
//! moves out of `pending` exactly once no matter how many reviewers act on it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantSnapshot, PaymentStatus, RequestStatus, SubscriptionPlan, SubscriptionRequest,
    SubscriptionRequestId, CURRENCY,
};
pub use repository::{
    RequestFilter, ReviewCommit, ReviewDecision, ReviewEntry, ReviewOutcome, ReviewReceipt,
    SubscriptionStore,
};
pub use router::subscription_router;
pub use service::{ReviewError, SubmissionDraft, SubmissionError, SubscriptionService};
