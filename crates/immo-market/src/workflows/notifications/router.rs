use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;

use super::domain::NotificationId;
use super::repository::NotificationStore;
use super::service::{NotificationError, NotificationService};
use crate::auth::Principal;
use crate::store::GENERIC_FAILURE_MESSAGE;
use crate::workflows::accounts::repository::UserDirectory;

/// Router builder exposing the caller's inbox and live unread feed.
pub fn notification_router<S>(service: Arc<NotificationService<S>>) -> Router
where
    S: NotificationStore + UserDirectory + 'static,
{
    Router::new()
        .route("/api/v1/notifications", get(inbox_handler::<S>))
        .route("/api/v1/notifications/read-all", post(mark_all_handler::<S>))
        .route("/api/v1/notifications/stream", get(stream_handler::<S>))
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S>),
        )
        .with_state(service)
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NotificationError::Access(err) => (err.status_code(), err.user_message()),
            NotificationError::NotFound(_) => (StatusCode::NOT_FOUND, GENERIC_FAILURE_MESSAGE),
            NotificationError::NotRecipient(_) => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            NotificationError::Repository(err) => (err.status_code(), err.user_message()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InboxQuery {
    #[serde(default)]
    unread: bool,
}

pub(crate) async fn inbox_handler<S>(
    State(service): State<Arc<NotificationService<S>>>,
    principal: Principal,
    Query(query): Query<InboxQuery>,
) -> Response
where
    S: NotificationStore + UserDirectory + 'static,
{
    let result = if query.unread {
        service.unread(&principal)
    } else {
        service.inbox(&principal)
    };
    match result {
        Ok(notifications) => (StatusCode::OK, Json(notifications)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mark_read_handler<S>(
    State(service): State<Arc<NotificationService<S>>>,
    principal: Principal,
    Path(notification_id): Path<String>,
) -> Response
where
    S: NotificationStore + UserDirectory + 'static,
{
    match service.mark_read(&principal, &NotificationId(notification_id)) {
        Ok(notification) => (StatusCode::OK, Json(notification)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mark_all_handler<S>(
    State(service): State<Arc<NotificationService<S>>>,
    principal: Principal,
) -> Response
where
    S: NotificationStore + UserDirectory + 'static,
{
    match service.mark_all_read(&principal) {
        Ok(report) => {
            let status = if report.is_complete() {
                StatusCode::OK
            } else {
                StatusCode::MULTI_STATUS
            };
            (status, Json(report)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Server-sent events: the current unread snapshot, then one `unread` event per change.
pub(crate) async fn stream_handler<S>(
    State(service): State<Arc<NotificationService<S>>>,
    principal: Principal,
) -> Response
where
    S: NotificationStore + UserDirectory + 'static,
{
    let listener = match service.listen(&principal) {
        Ok(listener) => listener,
        Err(err) => return err.into_response(),
    };

    let initial = listener.snapshot();
    let first = stream::once(async move { Event::default().event("unread").json_data(initial) });
    let updates = stream::unfold(listener, |mut listener| async move {
        let event = listener.next().await?;
        Some((Event::default().event("unread").json_data(event), listener))
    });

    Sse::new(first.chain(updates))
        .keep_alive(KeepAlive::default())
        .into_response()
}
