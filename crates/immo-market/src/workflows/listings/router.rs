use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{ListingDraft, ListingFilter, ListingId};
use super::repository::ListingRepository;
use super::service::{ListingError, ListingService};
use crate::auth::Principal;
use crate::store::GENERIC_FAILURE_MESSAGE;
use crate::workflows::accounts::repository::UserDirectory;
use crate::workflows::notifications::repository::NotificationStore;

pub fn listing_router<S>(service: Arc<ListingService<S>>) -> Router
where
    S: ListingRepository + UserDirectory + NotificationStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            get(search_handler::<S>).post(create_handler::<S>),
        )
        .route("/api/v1/listings/:listing_id", get(listing_handler::<S>))
        .route(
            "/api/v1/listings/:listing_id/archive",
            post(archive_handler::<S>),
        )
        .with_state(service)
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ListingError::Access(err) => return err.into_response(),
            ListingError::SubscriptionRequired => (
                StatusCode::PAYMENT_REQUIRED,
                "An active subscription is required to publish listings.",
            ),
            ListingError::Invalid(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason),
            ListingError::NotFound(_) => (StatusCode::NOT_FOUND, GENERIC_FAILURE_MESSAGE),
            ListingError::Repository(err) => (err.status_code(), err.user_message()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub(crate) async fn search_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Query(filter): Query<ListingFilter>,
) -> Response
where
    S: ListingRepository + UserDirectory + NotificationStore + 'static,
{
    match service.search(&filter) {
        Ok(listings) => (StatusCode::OK, Json(listings)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    principal: Principal,
    Json(draft): Json<ListingDraft>,
) -> Response
where
    S: ListingRepository + UserDirectory + NotificationStore + 'static,
{
    match service.create(&principal, draft) {
        Ok(listing) => (StatusCode::CREATED, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn listing_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingRepository + UserDirectory + NotificationStore + 'static,
{
    match service.get(&ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn archive_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    principal: Principal,
    Path(listing_id): Path<String>,
) -> Response
where
    S: ListingRepository + UserDirectory + NotificationStore + 'static,
{
    match service.archive(&principal, &ListingId(listing_id)) {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(err) => err.into_response(),
    }
}
