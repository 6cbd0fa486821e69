use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{SubscriptionPlan, SubscriptionRequestId, CURRENCY};
use super::repository::{RequestFilter, SubscriptionStore};
use super::service::{
    ReviewError, SubmissionError, SubscriptionService, INCOMPLETE_PROFILE_MESSAGE,
};
use crate::auth::Principal;
use crate::store::GENERIC_FAILURE_MESSAGE;
use crate::workflows::accounts::domain::SubscriptionGrant;
use crate::workflows::accounts::repository::UserDirectory;

/// Router builder exposing plan selection, submission, and the admin review console.
pub fn subscription_router<S>(service: Arc<SubscriptionService<S>>) -> Router
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    Router::new()
        .route("/api/v1/subscriptions/plans", get(plans_handler))
        .route("/api/v1/subscriptions/quote", post(quote_handler::<S>))
        .route("/api/v1/subscriptions/requests", post(submit_handler::<S>))
        .route(
            "/api/v1/subscriptions/requests/:request_id",
            get(request_handler::<S>),
        )
        .route(
            "/api/v1/admin/subscriptions/requests",
            get(review_queue_handler::<S>),
        )
        .route(
            "/api/v1/admin/subscriptions/requests/export",
            get(export_handler::<S>),
        )
        .route(
            "/api/v1/admin/subscriptions/requests/:request_id/approve",
            post(approve_handler::<S>),
        )
        .route(
            "/api/v1/admin/subscriptions/requests/:request_id/reject",
            post(reject_handler::<S>),
        )
        .with_state(service)
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        match self {
            SubmissionError::Access(err) => err.into_response(),
            SubmissionError::IncompleteProfile { missing } => {
                let payload = json!({
                    "error": INCOMPLETE_PROFILE_MESSAGE,
                    "missing": missing,
                });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
            }
            SubmissionError::Repository(err) => {
                let payload = json!({ "error": err.user_message() });
                (err.status_code(), Json(payload)).into_response()
            }
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        match self {
            ReviewError::Access(err) => err.into_response(),
            ReviewError::NotFound(_) => {
                let payload = json!({ "error": GENERIC_FAILURE_MESSAGE });
                (StatusCode::NOT_FOUND, Json(payload)).into_response()
            }
            ReviewError::AlreadyReviewed(status) => {
                let payload = json!({
                    "error": format!("This request has already been {}.", status.label()),
                    "status": status,
                });
                (StatusCode::CONFLICT, Json(payload)).into_response()
            }
            ReviewError::Export(_) => {
                let payload = json!({ "error": GENERIC_FAILURE_MESSAGE });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
            }
            ReviewError::Repository(err) => {
                let payload = json!({ "error": err.user_message() });
                (err.status_code(), Json(payload)).into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PlanView {
    plan: SubscriptionPlan,
    price: u32,
    currency: &'static str,
    advertised_days: u32,
    granted_days: i64,
}

pub(crate) async fn plans_handler() -> Json<Vec<PlanView>> {
    Json(
        SubscriptionPlan::ALL
            .into_iter()
            .map(|plan| PlanView {
                plan,
                price: plan.price(),
                currency: CURRENCY,
                advertised_days: plan.advertised_days(),
                granted_days: SubscriptionGrant::GRANT_DAYS,
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) plan: SubscriptionPlan,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct SubmitRequest {
    pub(crate) plan: SubscriptionPlan,
    #[serde(default)]
    pub(crate) confirmed: bool,
}

pub(crate) async fn quote_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Json(payload): Json<QuoteRequest>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.prepare(&principal, payload.plan) {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Second half of the select → confirm → write sequence. Unconfirmed submissions are
/// validated and echoed back without touching the store.
pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Json(payload): Json<SubmitRequest>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    let draft = match service.prepare(&principal, payload.plan) {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };

    if !payload.confirmed {
        let body = json!({
            "error": "Please confirm the subscription request.",
            "draft": draft,
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    }

    match service.confirm(draft) {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn request_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Path(request_id): Path<String>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.get(&principal, &SubscriptionRequestId(request_id)) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn review_queue_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Query(filter): Query<RequestFilter>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.review_queue(&principal, &filter) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Query(filter): Query<RequestFilter>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.export_csv(&principal, &filter) {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"subscription-requests.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn approve_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Path(request_id): Path<String>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.approve(&principal, &SubscriptionRequestId(request_id)) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn reject_handler<S>(
    State(service): State<Arc<SubscriptionService<S>>>,
    principal: Principal,
    Path(request_id): Path<String>,
) -> Response
where
    S: SubscriptionStore + UserDirectory + 'static,
{
    match service.reject(&principal, &SubscriptionRequestId(request_id)) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}
