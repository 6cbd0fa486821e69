use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AccountView, NewUser, Role, UserProfile};
use super::repository::UserDirectory;
use super::service::{AccountError, AccountService};
use crate::auth::Principal;
use crate::workflows::notifications::repository::NotificationStore;

/// Router builder for public sign-up and the caller's own account.
pub fn account_router<S>(service: Arc<AccountService<S>>) -> Router
where
    S: UserDirectory + NotificationStore + 'static,
{
    Router::new()
        .route("/api/v1/accounts", post(register_handler::<S>))
        .route("/api/v1/me", get(me_handler::<S>).put(update_profile_handler::<S>))
        .with_state(service)
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            AccountError::Access(err) => err.into_response(),
            AccountError::Invalid(reason) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": reason }))).into_response()
            }
            AccountError::Repository(err) => {
                let payload = json!({ "error": err.user_message() });
                (err.status_code(), Json(payload)).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) role: Role,
    #[serde(flatten)]
    pub(crate) profile: UserProfile,
}

/// Admins are provisioned out of band; public sign-up is limited to agents and clients.
pub(crate) async fn register_handler<S>(
    State(service): State<Arc<AccountService<S>>>,
    Json(payload): Json<RegisterRequest>,
) -> Response
where
    S: UserDirectory + NotificationStore + 'static,
{
    if payload.role == Role::Admin {
        let body = json!({ "error": "This role cannot be requested at sign-up." });
        return (StatusCode::FORBIDDEN, Json(body)).into_response();
    }

    match service.register(NewUser {
        role: payload.role,
        profile: payload.profile,
    }) {
        Ok(account) => {
            let view = AccountView::at(&account, account.created_at);
            (StatusCode::CREATED, Json(view)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn me_handler<S>(
    State(service): State<Arc<AccountService<S>>>,
    principal: Principal,
) -> Response
where
    S: UserDirectory + NotificationStore + 'static,
{
    match service.me(&principal) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_profile_handler<S>(
    State(service): State<Arc<AccountService<S>>>,
    principal: Principal,
    Json(profile): Json<UserProfile>,
) -> Response
where
    S: UserDirectory + NotificationStore + 'static,
{
    match service.update_profile(&principal, profile) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}
